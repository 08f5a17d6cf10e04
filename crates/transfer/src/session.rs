use std::time::{Duration, Instant};

use filedrop_protocol::{TransferDirection, TransferProgress, TransferState};
use tokio_util::sync::CancellationToken;

use crate::TransferError;

/// State of one logical upload or download.
///
/// A session is owned by the coordinator driving it; the only piece shared
/// with other tasks is the cancellation token, which the registry hands out
/// to anyone cancelling by id.
#[derive(Debug)]
pub struct TransferSession {
    id: String,
    direction: TransferDirection,
    total_size: Option<u64>,
    total_chunks: Option<u32>,
    session_token: Option<String>,
    bytes_transferred: u64,
    chunks_completed: u32,
    state: TransferState,
    cancel: CancellationToken,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    error: Option<String>,
}

impl TransferSession {
    /// Creates a pending upload of `total_size` bytes split into `total_chunks`.
    pub fn upload(
        id: impl Into<String>,
        total_size: u64,
        total_chunks: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(
            id.into(),
            TransferDirection::Upload,
            Some(total_size),
            Some(total_chunks),
            cancel,
        )
    }

    /// Creates a pending download; its size is learned from the response.
    pub fn download(id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self::new(id.into(), TransferDirection::Download, None, None, cancel)
    }

    fn new(
        id: String,
        direction: TransferDirection,
        total_size: Option<u64>,
        total_chunks: Option<u32>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            direction,
            total_size,
            total_chunks,
            session_token: None,
            bytes_transferred: 0,
            chunks_completed: 0,
            state: TransferState::Pending,
            cancel,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    fn transition(&mut self, next: TransferState) -> Result<(), TransferError> {
        if !self.state.can_transition_to(next) {
            return Err(TransferError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        let now = Instant::now();
        if next == TransferState::InFlight {
            self.started_at = Some(now);
        } else if next.is_terminal() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    /// Marks the first chunk or slice as dispatched. No-op once in flight.
    pub fn start(&mut self) -> Result<(), TransferError> {
        if self.state == TransferState::InFlight {
            return Ok(());
        }
        self.transition(TransferState::InFlight)
    }

    /// Marks the session completed.
    pub fn complete(&mut self) -> Result<(), TransferError> {
        self.transition(TransferState::Completed)
    }

    /// Marks the session cancelled.
    pub fn mark_cancelled(&mut self) -> Result<(), TransferError> {
        self.transition(TransferState::Cancelled)
    }

    /// Marks the session failed with a human-readable cause.
    pub fn fail(&mut self, error: &str) -> Result<(), TransferError> {
        self.transition(TransferState::Failed)?;
        self.error = Some(error.to_string());
        Ok(())
    }

    /// Records the declared download length. Only valid before the transfer starts.
    pub fn set_total_size(&mut self, total: Option<u64>) -> Result<(), TransferError> {
        if self.state != TransferState::Pending {
            return Err(TransferError::InvalidTransition {
                from: self.state,
                to: self.state,
            });
        }
        self.total_size = total;
        Ok(())
    }

    /// Records the session token from a chunk response.
    ///
    /// The first token wins. Receiving the same token again is fine; a
    /// different one means the server lost track of the upload.
    pub fn record_token(&mut self, token: &str) -> Result<(), TransferError> {
        match &self.session_token {
            None => {
                self.session_token = Some(token.to_string());
                Ok(())
            }
            Some(existing) if existing == token => Ok(()),
            Some(existing) => Err(TransferError::ProtocolInconsistency(format!(
                "session token changed from {existing:?} to {token:?}"
            ))),
        }
    }

    /// Adds `bytes` to the transferred count.
    ///
    /// Fails if the count would exceed a known total size.
    pub fn add_bytes(&mut self, bytes: u64) -> Result<u64, TransferError> {
        let next = self.bytes_transferred + bytes;
        if let Some(total) = self.total_size
            && next > total
        {
            return Err(TransferError::Transport(format!(
                "received {next} bytes but only {total} were declared"
            )));
        }
        self.bytes_transferred = next;
        Ok(next)
    }

    /// Records an acknowledged upload chunk of `bytes` bytes.
    pub fn record_chunk(&mut self, bytes: u64) -> Result<(), TransferError> {
        self.add_bytes(bytes)?;
        self.chunks_completed += 1;
        Ok(())
    }

    /// Returns `true` once someone asked to cancel this transfer.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by the coordinator at its check points.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub fn total_chunks(&self) -> Option<u32> {
        self.total_chunks
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn chunks_completed(&self) -> u32 {
        self.chunks_completed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Time spent in flight, up to now or to the terminal transition.
    pub fn elapsed(&self) -> Option<Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Instant::now) - started)
    }

    /// Returns a snapshot for progress consumers.
    pub fn progress(&self) -> TransferProgress {
        TransferProgress {
            id: self.id.clone(),
            direction: self.direction,
            state: self.state,
            total_bytes: self.total_size,
            bytes_transferred: self.bytes_transferred,
            chunks_completed: self.chunks_completed,
            total_chunks: self.total_chunks,
            error: self.error.clone(),
        }
    }
}
