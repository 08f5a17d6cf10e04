//! File server client.
//!
//! Async HTTP client using `reqwest`. One instance serves any number of
//! concurrent transfers.

use filedrop_coordinator::{DownloadStream, EndpointFuture, RemoteEndpoint};
use filedrop_protocol::constants::{
    CHUNK_PART_FILE_NAME, CHUNK_PART_MIME, DOWNLOAD_PATH_PREFIX, FIELD_CHUNK, UPLOAD_CHUNK_PATH,
};
use filedrop_protocol::{ChunkAck, ChunkSubmission, ErrorResponse};
use filedrop_transfer::TransferError;
use futures_util::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Characters left as-is when a path is placed in a single URL segment.
/// Everything else, `/` included, is percent-encoded.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Errors from the file server client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

impl From<Error> for TransferError {
    fn from(e: Error) -> Self {
        TransferError::Transport(e.to_string())
    }
}

/// Percent-encodes `path` as a single URL path segment.
pub fn encode_path_component(path: &str) -> String {
    utf8_percent_encode(path, URI_COMPONENT).to_string()
}

/// Remote endpoint backed by a file server reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    http: reqwest::Client,
    base_url: String,
}

impl HttpEndpoint {
    /// Creates a client for the server at `base_url` (e.g. `http://nas:5000`).
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("filedrop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn upload_url(&self) -> String {
        format!("{}{UPLOAD_CHUNK_PATH}", self.base_url)
    }

    /// URL a download of `path` is fetched from.
    pub fn download_url(&self, path: &str) -> String {
        format!(
            "{}{DOWNLOAD_PATH_PREFIX}{}",
            self.base_url,
            encode_path_component(path)
        )
    }

    /// Posts one chunk and parses the acknowledgement.
    pub async fn send_chunk(&self, submission: ChunkSubmission) -> Result<ChunkAck, Error> {
        let chunk_number = submission.chunk_number;
        let form = build_form(submission)?;

        let resp = self.http.post(self.upload_url()).multipart(form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(chunk = chunk_number, status = status.as_u16(), "chunk response");

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Starts a download of `path` and returns its body as a stream.
    pub async fn open(&self, path: &str) -> Result<DownloadStream, Error> {
        let resp = self.http.get(self.download_url(path)).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        let content_length = resp.content_length();
        debug!(path, content_length = ?content_length, "download response");

        let body = resp
            .bytes_stream()
            .map(|slice| slice.map_err(|e| TransferError::from(Error::Http(e))))
            .boxed();
        Ok(DownloadStream::new(content_length, body))
    }
}

impl RemoteEndpoint for HttpEndpoint {
    fn submit_chunk(&self, submission: ChunkSubmission) -> EndpointFuture<'_, ChunkAck> {
        Box::pin(async move { Ok(self.send_chunk(submission).await?) })
    }

    fn open_download<'a>(&'a self, path: &'a str) -> EndpointFuture<'a, DownloadStream> {
        Box::pin(async move { Ok(self.open(path).await?) })
    }
}

/// Builds the multipart form for one chunk: the `chunk` file part first,
/// then the text fields.
fn build_form(submission: ChunkSubmission) -> Result<Form, Error> {
    let fields = submission.text_fields();
    let chunk = Part::bytes(submission.chunk)
        .file_name(CHUNK_PART_FILE_NAME)
        .mime_str(CHUNK_PART_MIME)?;

    let mut form = Form::new().part(FIELD_CHUNK, chunk);
    for (name, value) in fields {
        form = form.text(name, value);
    }
    Ok(form)
}

/// Extracts a readable message from an error body.
///
/// The server answers failures with `{"error": "..."}`; anything else is
/// passed through as text.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(resp) => resp.error,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}
