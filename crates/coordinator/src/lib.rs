//! Upload and download coordinators.
//!
//! A coordinator drives one [`TransferSession`] against a
//! [`RemoteEndpoint`]: chunk by chunk for uploads, slice by slice for
//! downloads. [`TransferService`] ties them to the active-transfer registry
//! and the event channel, and is what front ends talk to.
//!
//! The crate has no transport dependency. `filedrop-http` provides the
//! HTTP implementation of [`RemoteEndpoint`]; tests use in-memory mocks.
//!
//! [`TransferSession`]: filedrop_transfer::TransferSession

pub mod download;
pub mod endpoint;
pub mod service;
pub mod types;
pub mod upload;

#[cfg(test)]
mod mock;

use std::future::Future;
use std::time::Duration;

use filedrop_transfer::{TransferError, TransferSession};
use tracing::debug;

// Re-export primary types for convenience.
pub use download::DownloadCoordinator;
pub use endpoint::{DownloadStream, EndpointFuture, RemoteEndpoint};
pub use service::TransferService;
pub use types::{TransferConfig, TransferEvent, TransferOutcome};
pub use upload::UploadCoordinator;

/// Runs `fut`, failing with a transport error if it takes longer than `limit`.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, TransferError>>,
) -> Result<T, TransferError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransferError::Transport(format!(
            "{what} timed out after {limit:?}"
        ))),
    }
}

/// Moves `session` into its terminal state according to `result`.
///
/// A failure observed after cancellation was requested is reported as a
/// cancellation. Returns the cause when the transfer did not complete.
pub(crate) fn settle(
    session: &mut TransferSession,
    result: Result<(), TransferError>,
) -> Result<(), TransferError> {
    match result {
        Ok(()) => session.complete(),
        Err(e) if e.is_cancelled() || session.is_cancel_requested() => {
            if !e.is_cancelled() {
                debug!(id = session.id(), error = %e, "discarding failure after cancellation");
            }
            session.mark_cancelled()?;
            Err(TransferError::Cancelled)
        }
        Err(e) => {
            session.fail(&e.to_string())?;
            Err(e)
        }
    }
}
