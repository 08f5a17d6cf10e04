//! HTTP implementation of the filedrop remote endpoint.
//!
//! Chunks are posted as `multipart/form-data` to `/upload_chunk`; downloads
//! stream the body of `GET /download/<path>`.

pub mod client;

pub use client::{Error, HttpEndpoint, encode_path_component};
