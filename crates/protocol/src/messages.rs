use serde::{Deserialize, Serialize};

use crate::constants::{
    FIELD_CHUNK_NUMBER, FIELD_FILE_SIZE, FIELD_FILENAME, FIELD_TOTAL_CHUNKS, FIELD_UPLOAD_ID,
};

/// One chunk of an upload, before it is encoded as a multipart form.
///
/// The raw bytes travel in the `chunk` file part; every other field is a
/// text part (see [`text_fields`](Self::text_fields)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSubmission {
    /// Destination path on the server.
    pub filename: String,
    /// Zero-based chunk index.
    pub chunk_number: u32,
    /// Total number of chunks in the upload (at least 1).
    pub total_chunks: u32,
    /// Total size of the file in bytes.
    pub file_size: u64,
    /// Session token issued by the server, once known.
    pub upload_id: Option<String>,
    /// Raw chunk bytes.
    pub chunk: Vec<u8>,
}

impl ChunkSubmission {
    /// Returns the text parts of the form in wire order.
    ///
    /// `upload_id` is only present once the server has issued one.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (FIELD_FILENAME, self.filename.clone()),
            (FIELD_CHUNK_NUMBER, self.chunk_number.to_string()),
            (FIELD_TOTAL_CHUNKS, self.total_chunks.to_string()),
            (FIELD_FILE_SIZE, self.file_size.to_string()),
        ];
        if let Some(token) = &self.upload_id {
            fields.push((FIELD_UPLOAD_ID, token.clone()));
        }
        fields
    }

    /// Returns `true` for the last chunk of the upload.
    pub fn is_last(&self) -> bool {
        self.chunk_number + 1 >= self.total_chunks
    }
}

/// JSON body returned for a chunk submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkAck {
    /// Returns `true` unless the server reported an error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the session token, treating an empty string as absent.
    pub fn session_token(&self) -> Option<&str> {
        self.upload_id.as_deref().filter(|t| !t.is_empty())
    }
}

/// Error body returned by the server on failure (`{"error": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
