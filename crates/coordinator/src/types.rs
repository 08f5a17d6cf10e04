//! Events, outcomes and configuration for coordinated transfers.

use std::time::Duration;

use filedrop_transfer::{
    DEFAULT_CHUNK_SIZE, DEFAULT_OPERATION_TIMEOUT, TransferDirection, TransferError,
    TransferProgress, TransferState,
};

/// Notification emitted while a transfer runs.
///
/// Every transfer produces zero or more `Progress` events followed by
/// exactly one terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// A chunk was acknowledged or a slice was written.
    Progress(TransferProgress),
    Completed {
        id: String,
        direction: TransferDirection,
        bytes_transferred: u64,
    },
    Cancelled {
        id: String,
        direction: TransferDirection,
        bytes_transferred: u64,
    },
    Failed {
        id: String,
        direction: TransferDirection,
        error: String,
    },
}

impl TransferEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Progress(p) => &p.id,
            Self::Completed { id, .. } | Self::Cancelled { id, .. } | Self::Failed { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Final result of a transfer, returned to the caller that started it.
#[derive(Debug)]
pub struct TransferOutcome {
    pub id: String,
    pub direction: TransferDirection,
    /// One of the terminal states.
    pub state: TransferState,
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
    /// Upload session token issued by the server.
    pub session_token: Option<String>,
    /// Cause of a failure. `None` unless `state` is `Failed`.
    pub error: Option<TransferError>,
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == TransferState::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == TransferState::Cancelled
    }
}

/// Tunables shared by all transfers of a [`TransferService`](crate::TransferService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Upload chunk size in bytes. Must be non-zero.
    pub chunk_size: u64,
    /// Bound on each chunk submission, download open and slice read.
    pub operation_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl TransferConfig {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}
