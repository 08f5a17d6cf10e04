//! Terminal progress output.

use std::io::Write;
use std::time::Duration;

use filedrop_coordinator::TransferEvent;
use filedrop_transfer::{SpeedCalculator, TransferProgress};
use tokio::sync::mpsc;

/// Prints transfer events to stderr until the channel closes.
pub async fn render_events(mut rx: mpsc::UnboundedReceiver<TransferEvent>) {
    let mut speed = SpeedCalculator::default();
    let mut stderr = std::io::stderr();

    while let Some(event) = rx.recv().await {
        let line = match &event {
            TransferEvent::Progress(progress) => {
                speed.update(progress.bytes_transferred);
                let _ = write!(stderr, "\r{}\x1b[K", progress_line(progress, &speed));
                let _ = stderr.flush();
                continue;
            }
            TransferEvent::Completed {
                id,
                bytes_transferred,
                ..
            } => format!("{id}: done, {}", format_bytes(*bytes_transferred)),
            TransferEvent::Cancelled {
                id,
                bytes_transferred,
                ..
            } => format!(
                "{id}: cancelled after {}",
                format_bytes(*bytes_transferred)
            ),
            TransferEvent::Failed { id, error, .. } => format!("{id}: failed: {error}"),
        };
        let _ = writeln!(stderr, "\r{line}\x1b[K");
        speed.reset();
    }
}

/// Single status line for a progress snapshot.
pub fn progress_line(progress: &TransferProgress, speed: &SpeedCalculator) -> String {
    let mut line = format!("{} {}", progress.direction, progress.id);

    match (progress.percentage(), progress.total_bytes) {
        (Some(pct), Some(total)) => line.push_str(&format!(
            " {pct:5.1}% {}/{}",
            format_bytes(progress.bytes_transferred),
            format_bytes(total)
        )),
        _ => line.push_str(&format!(" {}", format_bytes(progress.bytes_transferred))),
    }

    if let Some(total) = progress.total_chunks {
        line.push_str(&format!(" [{}/{total}]", progress.chunks_completed));
    }

    let rate = speed.bytes_per_second();
    if rate > 0.0 {
        line.push_str(&format!(" {}/s", format_bytes(rate as u64)));
        if let Some(total) = progress.total_bytes
            && let Some(eta) = speed.eta(total.saturating_sub(progress.bytes_transferred))
        {
            line.push_str(&format!(" eta {}", format_duration(eta)));
        }
    }
    line
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60),
    }
}
