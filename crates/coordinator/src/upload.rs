//! Sequential chunked upload of one session.

use std::io;

use filedrop_protocol::ChunkSubmission;
use filedrop_transfer::{ByteSource, ChunkSplitter, TransferError, TransferSession};
use tokio::sync::mpsc;
use tracing::debug;

use crate::endpoint::RemoteEndpoint;
use crate::types::{TransferConfig, TransferEvent};
use crate::{settle, with_timeout};

/// Drives one upload session to a terminal state.
///
/// Chunks are sent strictly in index order, one at a time. The session
/// token from the first acknowledgement is attached to every later chunk.
/// Cancellation is checked before each chunk is read, again before it is
/// sent, and once more when its acknowledgement arrives. A chunk already
/// sent is allowed to finish, but its result is discarded.
pub struct UploadCoordinator<'a> {
    endpoint: &'a dyn RemoteEndpoint,
    config: &'a TransferConfig,
    events_tx: &'a mpsc::UnboundedSender<TransferEvent>,
}

impl<'a> UploadCoordinator<'a> {
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

    /// Uploads `source` to `destination`.
    ///
    /// On return the session is terminal. `Ok` means every chunk was
    /// acknowledged; otherwise the error is the cause (or
    /// [`TransferError::Cancelled`]).
    pub async fn run(
        &self,
        session: &mut TransferSession,
        splitter: ChunkSplitter,
        source: &mut dyn ByteSource,
        destination: &str,
    ) -> Result<(), TransferError> {
        let result = self
            .send_chunks(session, splitter, source, destination)
            .await;
        settle(session, result)
    }

    async fn send_chunks(
        &self,
        session: &mut TransferSession,
        splitter: ChunkSplitter,
        source: &mut dyn ByteSource,
        destination: &str,
    ) -> Result<(), TransferError> {
        // An empty source still makes one zero-length submission so the
        // server creates the file.
        let total_chunks = splitter.wire_chunk_count();

        for index in 0..total_chunks {
            check_cancelled(session)?;

            let spec = splitter.get(index);
            let expected = spec.map_or(0, |spec| spec.length);
            let chunk = match spec {
                Some(spec) => source
                    .read_chunk(spec)
                    .await
                    .map_err(TransferError::Source)?,
                None => Vec::new(),
            };
            let len = chunk.len() as u64;
            if len != expected {
                return Err(TransferError::Source(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("chunk {index}: source returned {len} of {expected} bytes"),
                )));
            }
            check_cancelled(session)?;

            let submission = ChunkSubmission {
                filename: destination.to_string(),
                chunk_number: index,
                total_chunks,
                file_size: splitter.total_size(),
                upload_id: session.session_token().map(str::to_string),
                chunk,
            };

            session.start()?;
            debug!(
                id = session.id(),
                chunk = index,
                total_chunks,
                bytes = len,
                "sending chunk"
            );

            let what = format!("chunk {index}");
            let ack = with_timeout(
                self.config.operation_timeout,
                &what,
                self.endpoint.submit_chunk(submission),
            )
            .await?;
            // The chunk may have landed, but a cancelled upload ignores it.
            check_cancelled(session)?;

            if let Some(error) = ack.error.as_deref() {
                return Err(TransferError::Transport(format!(
                    "server rejected chunk {index}: {error}"
                )));
            }

            match ack.session_token() {
                Some(token) => session.record_token(token)?,
                None if session.session_token().is_none() && index + 1 < total_chunks => {
                    return Err(TransferError::ProtocolInconsistency(format!(
                        "no upload_id in response to chunk {index}"
                    )));
                }
                None => {}
            }

            session.record_chunk(len)?;
            let _ = self.events_tx.send(TransferEvent::Progress(session.progress()));
        }

        if session.bytes_transferred() != splitter.total_size() {
            return Err(TransferError::Source(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "sent {} of {} bytes",
                    session.bytes_transferred(),
                    splitter.total_size()
                ),
            )));
        }
        Ok(())
    }
}

fn check_cancelled(session: &TransferSession) -> Result<(), TransferError> {
    if session.is_cancel_requested() {
        Err(TransferError::Cancelled)
    } else {
        Ok(())
    }
}
