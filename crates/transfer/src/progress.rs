use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
const DEFAULT_MAX_SAMPLES: usize = 100;

#[derive(Debug, Clone, Copy)]
struct Sample {
    position: u64,
    at: Instant,
}

/// Estimates throughput from a sliding window of byte positions.
///
/// Feed it the cumulative `bytes_transferred` from each progress event;
/// speed is the position delta across the window divided by its duration.
#[derive(Debug)]
pub struct SpeedCalculator {
    samples: VecDeque<Sample>,
    window: Duration,
    max_samples: usize,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl SpeedCalculator {
    /// Creates a new calculator.
    ///
    /// - `window`: time window for speed calculation (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            window: window.unwrap_or(DEFAULT_WINDOW),
            max_samples: max_samples.unwrap_or(DEFAULT_MAX_SAMPLES).max(2),
        }
    }

    /// Records that `position` bytes have been transferred so far.
    pub fn update(&mut self, position: u64) {
        self.update_at(position, Instant::now());
    }

    fn update_at(&mut self, position: u64, at: Instant) {
        // A position going backwards means a new transfer started.
        if self.samples.back().is_some_and(|s| position < s.position) {
            self.samples.clear();
        }
        self.samples.push_back(Sample { position, at });

        // Keep one sample at or before the cutoff so the window stays full.
        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.len() > 2 && self.samples[1].at <= cutoff {
                self.samples.pop_front();
            }
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Average speed in bytes/second across the window.
    ///
    /// Returns 0.0 with fewer than two samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let elapsed = last.at.duration_since(first.at);
        if elapsed.is_zero() {
            return 0.0;
        }
        (last.position - first.position) as f64 / elapsed.as_secs_f64()
    }

    /// Estimates the time needed for `remaining_bytes`. `None` while the speed is zero.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_samples_means_no_speed() {
        let calc = SpeedCalculator::default();
        assert_eq!(calc.bytes_per_second(), 0.0);
        assert_eq!(calc.eta(1000), None);
    }

    #[test]
    fn single_sample_means_no_speed() {
        let mut calc = SpeedCalculator::default();
        calc.update(1000);
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn speed_from_position_delta() {
        let mut calc = SpeedCalculator::default();
        let t0 = Instant::now();
        calc.update_at(0, t0);
        calc.update_at(1000, t0 + Duration::from_millis(500));
        calc.update_at(2000, t0 + Duration::from_secs(1));

        let speed = calc.bytes_per_second();
        assert!((speed - 2000.0).abs() < 1e-6, "speed = {speed}");

        let eta = calc.eta(4000).unwrap();
        assert_eq!(eta, Duration::from_secs(2));
    }

    #[test]
    fn old_samples_leave_the_window() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(1)), None);
        let t0 = Instant::now();
        calc.update_at(0, t0);
        calc.update_at(100, t0 + Duration::from_secs(1));
        // Fast burst after a slow start.
        calc.update_at(10_100, t0 + Duration::from_secs(2));
        calc.update_at(20_100, t0 + Duration::from_secs(3));

        let speed = calc.bytes_per_second();
        assert!((speed - 10_000.0).abs() < 1e-6, "speed = {speed}");
    }

    #[test]
    fn max_samples_bounds_memory() {
        let mut calc = SpeedCalculator::new(Some(Duration::from_secs(60)), Some(5));
        let t0 = Instant::now();
        for i in 0..20u64 {
            calc.update_at(i * 10, t0 + Duration::from_millis(i));
        }
        assert!(calc.samples.len() <= 5);
    }

    #[test]
    fn position_going_backwards_restarts() {
        let mut calc = SpeedCalculator::default();
        let t0 = Instant::now();
        calc.update_at(5000, t0);
        calc.update_at(6000, t0 + Duration::from_secs(1));
        calc.update_at(10, t0 + Duration::from_secs(2));
        assert_eq!(calc.bytes_per_second(), 0.0);
    }

    #[test]
    fn reset_clears() {
        let mut calc = SpeedCalculator::default();
        let t0 = Instant::now();
        calc.update_at(0, t0);
        calc.update_at(100, t0 + Duration::from_secs(1));
        calc.reset();
        assert_eq!(calc.bytes_per_second(), 0.0);
    }
}
