use std::io::{self, SeekFrom};
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::{IoFuture, TransferError};

/// A contiguous byte range of the source, submitted as one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Zero-based position in the upload.
    pub index: u32,
    /// Byte offset within the source.
    pub offset: u64,
    /// Size of this chunk in bytes (never zero).
    pub length: u64,
}

impl ChunkSpec {
    /// Offset one past the last byte of the chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

// ---------------------------------------------------------------------------
// ChunkSplitter
// ---------------------------------------------------------------------------

/// Partitions `[0, total_size)` into fixed-size chunks.
///
/// Every chunk but the last is exactly `chunk_size` bytes. The splitter is
/// a plain value: iterating it twice yields the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    total_size: u64,
    chunk_size: u64,
    chunk_count: u32,
}

impl ChunkSplitter {
    /// Creates a splitter.
    ///
    /// A `chunk_size` of zero is rejected, as is any combination needing
    /// more chunks than a `u32` chunk number can address.
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        let chunk_count = u32::try_from(total_size.div_ceil(chunk_size)).map_err(|_| {
            TransferError::TooManyChunks {
                total_size,
                chunk_size,
            }
        })?;
        Ok(Self {
            total_size,
            chunk_size,
            chunk_count,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks: `ceil(total_size / chunk_size)`, zero for an empty source.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Chunk count announced to the server.
    ///
    /// An empty source still performs one zero-length submission to
    /// establish the upload, so this is never below 1.
    pub fn wire_chunk_count(&self) -> u32 {
        self.chunk_count().max(1)
    }

    /// Returns `true` if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    /// Returns the chunk at `index`, or `None` past the end.
    pub fn get(&self, index: u32) -> Option<ChunkSpec> {
        let offset = u64::from(index).checked_mul(self.chunk_size)?;
        if offset >= self.total_size {
            return None;
        }
        Some(ChunkSpec {
            index,
            offset,
            length: (self.total_size - offset).min(self.chunk_size),
        })
    }

    /// Iterates the chunks in ascending index order.
    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            splitter: *self,
            next: 0,
        }
    }
}

impl IntoIterator for ChunkSplitter {
    type Item = ChunkSpec;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> ChunkIter {
        self.iter()
    }
}

/// Lazy iterator over the chunks of a [`ChunkSplitter`].
#[derive(Debug, Clone)]
pub struct ChunkIter {
    splitter: ChunkSplitter,
    next: u32,
}

impl Iterator for ChunkIter {
    type Item = ChunkSpec;

    fn next(&mut self) -> Option<ChunkSpec> {
        let spec = self.splitter.get(self.next)?;
        self.next = self.next.saturating_add(1);
        Some(spec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.splitter.chunk_count().saturating_sub(self.next))
            .unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}

// ---------------------------------------------------------------------------
// Byte sources
// ---------------------------------------------------------------------------

/// A byte source of known length that can hand out arbitrary chunks.
pub trait ByteSource: Send {
    /// Total number of bytes the source holds.
    fn total_size(&self) -> u64;

    /// Reads exactly the bytes described by `spec`.
    fn read_chunk(&mut self, spec: ChunkSpec) -> IoFuture<'_, Vec<u8>>;
}

/// Reads chunks from a local file.
pub struct FileSource {
    file: tokio::fs::File,
    size: u64,
}

impl FileSource {
    /// Opens `path`; the size is taken from the file metadata at open time.
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(Self { file, size })
    }
}

impl ByteSource for FileSource {
    fn total_size(&self) -> u64 {
        self.size
    }

    fn read_chunk(&mut self, spec: ChunkSpec) -> IoFuture<'_, Vec<u8>> {
        Box::pin(async move {
            self.file.seek(SeekFrom::Start(spec.offset)).await?;
            let mut buf = vec![0u8; spec.length as usize];
            // A file that shrank since `open` surfaces as UnexpectedEof.
            self.file.read_exact(&mut buf).await?;
            Ok(buf)
        })
    }
}

/// Serves chunks from an in-memory buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSource for MemorySource {
    fn total_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_chunk(&mut self, spec: ChunkSpec) -> IoFuture<'_, Vec<u8>> {
        let slice = usize::try_from(spec.offset)
            .ok()
            .zip(usize::try_from(spec.end()).ok())
            .and_then(|(start, end)| self.data.get(start..end));
        let result = match slice {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "chunk {} ({}..{}) is outside the {}-byte source",
                    spec.index,
                    spec.offset,
                    spec.end(),
                    self.data.len()
                ),
            )),
        };
        Box::pin(async move { result })
    }
}
