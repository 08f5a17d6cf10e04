//! The remote side of a transfer.
//!
//! `RemoteEndpoint` is implemented by `filedrop-http` on top of `reqwest`.
//! Keeping it a trait leaves the coordinators free of transport code and
//! testable with mocks.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use filedrop_protocol::{ChunkAck, ChunkSubmission};
use filedrop_transfer::TransferError;
use futures_util::stream::BoxStream;

/// Boxed future returned by [`RemoteEndpoint`] methods.
pub type EndpointFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// Abstract connection to the file server.
pub trait RemoteEndpoint: Send + Sync {
    /// Sends one chunk of an upload and returns the server's acknowledgement.
    ///
    /// Connection failures and non-success statuses are errors. A success
    /// status whose body carries an `error` field is returned as an
    /// acknowledgement; the coordinator decides what to do with it.
    fn submit_chunk(&self, submission: ChunkSubmission) -> EndpointFuture<'_, ChunkAck>;

    /// Opens a streamed download of `path`.
    fn open_download<'a>(&'a self, path: &'a str) -> EndpointFuture<'a, DownloadStream>;
}

/// An open download: the declared length plus the body as a byte stream.
///
/// Dropping the stream closes the underlying connection.
pub struct DownloadStream {
    /// `Content-Length` declared by the server, if any.
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, TransferError>>,
}

impl DownloadStream {
    pub fn new(
        content_length: Option<u64>,
        body: BoxStream<'static, Result<Bytes, TransferError>>,
    ) -> Self {
        Self {
            content_length,
            body,
        }
    }
}

impl fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
