//! Streamed download of one session into a byte sink.

use filedrop_transfer::{ByteSink, TransferError, TransferSession};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::endpoint::{DownloadStream, RemoteEndpoint};
use crate::types::{TransferConfig, TransferEvent};
use crate::{settle, with_timeout};

/// Drives one download session to a terminal state.
///
/// Cancellation is raced against every network wait, so a cancelled
/// download stops without waiting for the next slice. The response stream
/// is dropped (closing the connection) and the sink is aborted.
pub struct DownloadCoordinator<'a> {
    endpoint: &'a dyn RemoteEndpoint,
    config: &'a TransferConfig,
    events_tx: &'a mpsc::UnboundedSender<TransferEvent>,
}

impl<'a> DownloadCoordinator<'a> {
    pub fn new(
        endpoint: &'a dyn RemoteEndpoint,
        config: &'a TransferConfig,
        events_tx: &'a mpsc::UnboundedSender<TransferEvent>,
    ) -> Self {
        Self {
            endpoint,
            config,
            events_tx,
        }
    }

    /// Downloads `source_path` into `sink`.
    ///
    /// The sink is finalized only when the whole body arrived; on any other
    /// outcome it is aborted. On return the session is terminal.
    pub async fn run(
        &self,
        session: &mut TransferSession,
        source_path: &str,
        sink: &mut dyn ByteSink,
    ) -> Result<(), TransferError> {
        let mut result = self.receive(session, source_path, sink).await;

        if result.is_ok() {
            result = sink.finalize().await.map_err(TransferError::Sink);
        }
        if result.is_err()
            && let Err(e) = sink.abort().await
        {
            warn!(id = session.id(), error = %e, "failed to discard partial download");
        }

        settle(session, result)
    }

    async fn receive(
        &self,
        session: &mut TransferSession,
        source_path: &str,
        sink: &mut dyn ByteSink,
    ) -> Result<(), TransferError> {
        let cancel = session.cancel_token().clone();
        let timeout = self.config.operation_timeout;

        let DownloadStream {
            content_length,
            mut body,
        } = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            result = with_timeout(timeout, "download request", self.endpoint.open_download(source_path)) => result?,
        };

        session.set_total_size(content_length)?;
        session.start()?;
        debug!(
            id = session.id(),
            path = source_path,
            total_bytes = ?content_length,
            "download started"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                result = with_timeout(timeout, "download read", async { Ok(body.next().await) }) => result?,
            };

            let Some(slice) = next else {
                break;
            };
            let slice = slice?;
            if slice.is_empty() {
                continue;
            }

            // Counted before writing so an overlong body never reaches the sink.
            session.add_bytes(slice.len() as u64)?;
            sink.write(&slice).await.map_err(TransferError::Sink)?;
            let _ = self.events_tx.send(TransferEvent::Progress(session.progress()));
        }

        if let Some(total) = content_length
            && session.bytes_transferred() < total
        {
            return Err(TransferError::Transport(format!(
                "stream ended after {} of {total} bytes",
                session.bytes_transferred()
            )));
        }

        Ok(())
    }
}
