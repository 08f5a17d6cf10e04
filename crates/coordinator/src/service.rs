//! Entry point for front ends: registers transfers, runs the coordinators
//! and publishes events.

use std::sync::Arc;

use filedrop_transfer::{
    ByteSink, ByteSource, ChunkSplitter, TransferDirection, TransferError, TransferRegistry,
    TransferSession, TransferState, validate_remote_path,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::download::DownloadCoordinator;
use crate::endpoint::RemoteEndpoint;
use crate::types::{TransferConfig, TransferEvent, TransferOutcome};
use crate::upload::UploadCoordinator;

/// Runs uploads and downloads against one remote endpoint.
///
/// Transfers with different ids may run concurrently on the same service.
/// Each id is registered for the lifetime of its transfer and removed
/// before the terminal event is published, so a consumer reacting to that
/// event can immediately reuse the id.
pub struct TransferService {
    endpoint: Arc<dyn RemoteEndpoint>,
    registry: TransferRegistry,
    config: TransferConfig,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TransferEvent>>,
}

impl TransferService {
    /// Creates a service with its own registry.
    pub fn new(endpoint: Arc<dyn RemoteEndpoint>, config: TransferConfig) -> Self {
        Self::with_registry(endpoint, config, TransferRegistry::new())
    }

    /// Creates a service sharing an existing registry.
    pub fn with_registry(
        endpoint: Arc<dyn RemoteEndpoint>,
        config: TransferConfig,
        registry: TransferRegistry,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            endpoint,
            registry,
            config,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TransferEvent>> {
        self.events_rx.take()
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Requests cancellation of an active transfer. Unknown ids are ignored.
    pub fn cancel(&self, id: &str) -> bool {
        self.registry.cancel(id)
    }

    /// Uploads `source` to `destination` on the server under the id `id`.
    ///
    /// Returns `Err` only when the transfer could not be started (invalid
    /// path, zero chunk size, id already active). Once started, the
    /// transfer's terminal state is reported in the returned outcome.
    pub async fn upload(
        &self,
        id: &str,
        source: &mut dyn ByteSource,
        destination: &str,
    ) -> Result<TransferOutcome, TransferError> {
        validate_remote_path(destination)?;
        let splitter = ChunkSplitter::new(source.total_size(), self.config.chunk_size)?;
        let registration = self.registry.register(id, TransferDirection::Upload)?;

        let mut session = TransferSession::upload(
            id,
            splitter.total_size(),
            splitter.wire_chunk_count(),
            registration.cancel_token(),
        );
        info!(
            id,
            destination,
            bytes = splitter.total_size(),
            chunks = splitter.wire_chunk_count(),
            "upload started"
        );

        let result = UploadCoordinator::new(&*self.endpoint, &self.config, &self.events_tx)
            .run(&mut session, splitter, source, destination)
            .await;

        registration.release();
        Ok(self.finish(session, result))
    }

    /// Downloads `source_path` from the server into `sink` under the id `id`.
    ///
    /// Error semantics match [`upload`](Self::upload). A download rejected
    /// before it starts still aborts `sink`, so no partial file is left.
    pub async fn download(
        &self,
        id: &str,
        source_path: &str,
        sink: &mut dyn ByteSink,
    ) -> Result<TransferOutcome, TransferError> {
        let registration = match validate_remote_path(source_path)
            .and_then(|()| self.registry.register(id, TransferDirection::Download))
        {
            Ok(registration) => registration,
            Err(e) => {
                if let Err(abort_err) = sink.abort().await {
                    warn!(id, "failed to discard sink of rejected download: {abort_err}");
                }
                return Err(e);
            }
        };

        let mut session = TransferSession::download(id, registration.cancel_token());
        info!(id, source = source_path, "download started");

        let result = DownloadCoordinator::new(&*self.endpoint, &self.config, &self.events_tx)
            .run(&mut session, source_path, sink)
            .await;

        registration.release();
        Ok(self.finish(session, result))
    }

    fn finish(
        &self,
        session: TransferSession,
        result: Result<(), TransferError>,
    ) -> TransferOutcome {
        let id = session.id().to_string();
        let direction = session.direction();
        let bytes = session.bytes_transferred();

        let event = match session.state() {
            TransferState::Completed => {
                info!(id = %id, %direction, bytes, "transfer completed");
                TransferEvent::Completed {
                    id: id.clone(),
                    direction,
                    bytes_transferred: bytes,
                }
            }
            TransferState::Cancelled => {
                info!(id = %id, %direction, bytes, "transfer cancelled");
                TransferEvent::Cancelled {
                    id: id.clone(),
                    direction,
                    bytes_transferred: bytes,
                }
            }
            state => {
                let error = session
                    .error()
                    .map(str::to_string)
                    .or_else(|| result.as_ref().err().map(ToString::to_string))
                    .unwrap_or_else(|| format!("transfer ended in state {state}"));
                warn!(id = %id, %direction, bytes, error = %error, "transfer failed");
                TransferEvent::Failed {
                    id: id.clone(),
                    direction,
                    error,
                }
            }
        };
        let _ = self.events_tx.send(event);

        TransferOutcome {
            id,
            direction,
            state: session.state(),
            bytes_transferred: bytes,
            total_bytes: session.total_size(),
            session_token: session.session_token().map(str::to_string),
            error: result.err().filter(|e| !e.is_cancelled()),
        }
    }
}
