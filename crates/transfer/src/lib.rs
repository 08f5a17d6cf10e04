//! Chunked transfer primitives: splitting, sessions, and the registry of
//! active transfers.
//!
//! Nothing in this crate talks to the network. The coordinators that drive
//! a [`TransferSession`] against a remote endpoint live in
//! `filedrop-coordinator`.

mod chunked;
mod progress;
mod registry;
mod session;
mod sink;
mod validation;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use chunked::{ByteSource, ChunkIter, ChunkSpec, ChunkSplitter, FileSource, MemorySource};
pub use progress::SpeedCalculator;
pub use registry::{Registration, TransferRegistry};
pub use session::TransferSession;
pub use sink::{ByteSink, FileSink, MemorySink};
pub use validation::validate_remote_path;

pub use filedrop_protocol::{TransferDirection, TransferProgress, TransferState};

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Default bound on a single network operation (chunk submission, download
/// open, slice read).
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Boxed future returned by the async methods of [`ByteSource`] and [`ByteSink`].
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = std::io::Result<T>> + Send + 'a>>;

/// Errors produced while setting up or driving a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer already active: {0}")]
    DuplicateTransfer(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol inconsistency: {0}")]
    ProtocolInconsistency(String),

    #[error("cancelled")]
    Cancelled,

    #[error("source error: {0}")]
    Source(#[source] std::io::Error),

    #[error("sink error: {0}")]
    Sink(#[source] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("{total_size} bytes in chunks of {chunk_size} exceeds the chunk number range")]
    TooManyChunks { total_size: u64, chunk_size: u64 },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: TransferState,
        to: TransferState,
    },
}

impl TransferError {
    /// Returns `true` for caller cancellation, which is a normal outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
