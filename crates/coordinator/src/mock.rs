//! In-memory `RemoteEndpoint` used by the coordinator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use filedrop_protocol::{ChunkAck, ChunkSubmission};
use filedrop_transfer::TransferError;
use futures_util::StreamExt;
use futures_util::stream;

use crate::endpoint::{DownloadStream, EndpointFuture, RemoteEndpoint};

type SubmitHook = Box<dyn Fn(&ChunkSubmission) + Send + Sync>;

/// Mock endpoint that records submissions and replays scripted responses.
///
/// Chunk submissions without a scripted response are acknowledged with the
/// token they carried, or `default_token` when they carried none.
pub struct MockEndpoint {
    acks: Mutex<VecDeque<Result<ChunkAck, TransferError>>>,
    submissions: Mutex<Vec<ChunkSubmission>>,
    default_token: Option<String>,
    on_submit: Option<SubmitHook>,
    submit_delay: Option<Duration>,
    downloads: Mutex<VecDeque<Result<ScriptedDownload, TransferError>>>,
    opened: Mutex<Vec<String>>,
}

/// A download response: declared length plus the slices to stream.
pub struct ScriptedDownload {
    pub content_length: Option<u64>,
    pub slices: Vec<Result<Vec<u8>, TransferError>>,
    /// Stall forever after the scripted slices instead of ending.
    pub hang_after: bool,
}

impl ScriptedDownload {
    pub fn new(content_length: Option<u64>, slices: Vec<Vec<u8>>) -> Self {
        Self {
            content_length,
            slices: slices.into_iter().map(Ok).collect(),
            hang_after: false,
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang_after = true;
        self
    }
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::with_token("tok-1")
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            acks: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            default_token: Some(token.to_string()),
            on_submit: None,
            submit_delay: None,
            downloads: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn without_token() -> Self {
        let mut mock = Self::new();
        mock.default_token = None;
        mock
    }

    pub fn push_ack(&self, ack: Result<ChunkAck, TransferError>) {
        self.acks.lock().unwrap().push_back(ack);
    }

    pub fn push_token(&self, token: &str) {
        self.push_ack(Ok(ChunkAck {
            upload_id: Some(token.to_string()),
            ..Default::default()
        }));
    }

    pub fn push_download(&self, download: Result<ScriptedDownload, TransferError>) {
        self.downloads.lock().unwrap().push_back(download);
    }

    /// Runs `hook` for every submission before it is answered.
    pub fn on_submit(mut self, hook: impl Fn(&ChunkSubmission) + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Box::new(hook));
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn submissions(&self) -> Vec<ChunkSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl RemoteEndpoint for MockEndpoint {
    fn submit_chunk(&self, submission: ChunkSubmission) -> EndpointFuture<'_, ChunkAck> {
        Box::pin(async move {
            if let Some(hook) = &self.on_submit {
                hook(&submission);
            }
            let echoed = submission.upload_id.clone();
            self.submissions.lock().unwrap().push(submission);
            if let Some(delay) = self.submit_delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = self.acks.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(ChunkAck {
                    upload_id: echoed.or_else(|| self.default_token.clone()),
                    ..Default::default()
                })
            })
        })
    }

    fn open_download<'a>(&'a self, path: &'a str) -> EndpointFuture<'a, DownloadStream> {
        Box::pin(async move {
            self.opened.lock().unwrap().push(path.to_string());
            let scripted = self
                .downloads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransferError::Transport("HTTP 404".into())))?;

            let slices = stream::iter(
                scripted
                    .slices
                    .into_iter()
                    .map(|slice| slice.map(Bytes::from)),
            );
            let body = if scripted.hang_after {
                slices.chain(stream::pending()).boxed()
            } else {
                slices.boxed()
            };
            Ok(DownloadStream::new(scripted.content_length, body))
        })
    }
}
