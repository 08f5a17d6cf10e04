//! Wire types shared by the filedrop transfer crates.
//!
//! The remote endpoint is an existing HTTP file manager; the field names and
//! paths in [`constants`] must match it exactly.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{ChunkAck, ChunkSubmission, ErrorResponse};
pub use types::{TransferDirection, TransferProgress, TransferState};
