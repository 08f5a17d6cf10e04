//! Endpoint paths and form field names of the file manager HTTP API.

/// Path of the chunk submission endpoint (`POST`, multipart form).
pub const UPLOAD_CHUNK_PATH: &str = "/upload_chunk";

/// Prefix of the download endpoint; the percent-encoded remote path follows.
pub const DOWNLOAD_PATH_PREFIX: &str = "/download/";

/// Multipart field carrying the raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";

/// Multipart field carrying the destination path.
pub const FIELD_FILENAME: &str = "filename";

/// Multipart field carrying the zero-based chunk index.
pub const FIELD_CHUNK_NUMBER: &str = "chunk_number";

/// Multipart field carrying the total number of chunks.
pub const FIELD_TOTAL_CHUNKS: &str = "total_chunks";

/// Multipart field carrying the total file size in bytes.
pub const FIELD_FILE_SIZE: &str = "file_size";

/// Multipart field (and response key) carrying the server-issued session token.
pub const FIELD_UPLOAD_ID: &str = "upload_id";

/// File name attached to the `chunk` part, as browsers send for a `Blob` slice.
pub const CHUNK_PART_FILE_NAME: &str = "blob";

/// MIME type of the `chunk` part.
pub const CHUNK_PART_MIME: &str = "application/octet-stream";
