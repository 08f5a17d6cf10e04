use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Upload,
    Download,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// Lifecycle state of a transfer.
///
/// `Pending -> InFlight -> {Completed | Cancelled | Failed}`. A transfer may
/// also leave `Pending` straight for `Cancelled` or `Failed` when it never
/// dispatched anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Pending,
    InFlight,
    Completed,
    Cancelled,
    Failed,
}

impl TransferState {
    /// Returns `true` for states with no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::InFlight | Self::Cancelled | Self::Failed),
            Self::InFlight => next.is_terminal(),
            Self::Completed | Self::Cancelled | Self::Failed => false,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time snapshot of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub id: String,
    pub direction: TransferDirection,
    pub state: TransferState,
    /// Total size, when known. Downloads without a declared length have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    pub bytes_transferred: u64,
    /// Number of acknowledged chunks (uploads only).
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub chunks_completed: u32,
    /// Total number of chunks (uploads only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

impl TransferProgress {
    /// Returns progress as a percentage (0-100), if it can be computed.
    ///
    /// Uploads report the fraction of acknowledged chunks. Downloads report
    /// received bytes against the declared length, and `None` when the
    /// server declared no length.
    pub fn percentage(&self) -> Option<f64> {
        if let Some(total) = self.total_chunks
            && total > 0
        {
            return Some(f64::from(self.chunks_completed) / f64::from(total) * 100.0);
        }
        match self.total_bytes {
            Some(0) if self.state == TransferState::Completed => Some(100.0),
            Some(0) => Some(0.0),
            Some(total) => Some(self.bytes_transferred as f64 / total as f64 * 100.0),
            None => None,
        }
    }
}
