use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::IoFuture;

/// Destination for downloaded bytes.
///
/// A sink is written incrementally and then either finalized (the download
/// completed) or aborted (it was cancelled or failed). Neither may be
/// followed by further writes.
pub trait ByteSink: Send {
    /// Appends `data` to the sink.
    fn write<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()>;

    /// Makes the received bytes available as a complete artifact.
    fn finalize(&mut self) -> IoFuture<'_, ()>;

    /// Discards everything written so far.
    fn abort(&mut self) -> IoFuture<'_, ()>;
}

fn closed() -> io::Error {
    io::Error::other("sink is closed")
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Writes a download to disk.
///
/// Bytes go to a sibling `<name>.part` file that is renamed onto the target
/// path on [`finalize`](ByteSink::finalize) and deleted on
/// [`abort`](ByteSink::abort), so the target never holds a partial download.
pub struct FileSink {
    target: PathBuf,
    part_path: PathBuf,
    file: Option<BufWriter<tokio::fs::File>>,
}

impl FileSink {
    /// Creates the `.part` file next to `target`, creating parent
    /// directories as needed.
    pub async fn create(target: &Path) -> io::Result<Self> {
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part_path = part_path_for(target);
        let file = tokio::fs::File::create(&part_path).await?;
        Ok(Self {
            target: target.to_path_buf(),
            part_path,
            file: Some(BufWriter::new(file)),
        })
    }

    /// Final location of the download.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Temporary location used while the download is in progress.
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }
}

fn part_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    target.with_file_name(name)
}

impl ByteSink for FileSink {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        Box::pin(async move {
            let file = self.file.as_mut().ok_or_else(closed)?;
            file.write_all(data).await
        })
    }

    fn finalize(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async move {
            let mut file = self.file.take().ok_or_else(closed)?;
            file.flush().await?;
            file.get_mut().sync_all().await?;
            drop(file);
            tokio::fs::rename(&self.part_path, &self.target).await?;
            debug!(path = %self.target.display(), "download finalized");
            Ok(())
        })
    }

    fn abort(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async move {
            // Already finalized or aborted.
            if self.file.take().is_none() {
                return Ok(());
            }
            match tokio::fs::remove_file(&self.part_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            debug!(path = %self.part_path.display(), "partial download removed");
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Collects a download in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Vec<u8>,
    finalized: bool,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the downloaded bytes once the sink has been finalized.
    pub fn contents(&self) -> Option<&[u8]> {
        self.finalized.then_some(self.buf.as_slice())
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Consumes the sink, returning the bytes if it was finalized.
    pub fn into_contents(self) -> Option<Vec<u8>> {
        self.finalized.then_some(self.buf)
    }
}

impl ByteSink for MemorySink {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> IoFuture<'a, ()> {
        let result = if self.closed {
            Err(closed())
        } else {
            self.buf.extend_from_slice(data);
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn finalize(&mut self) -> IoFuture<'_, ()> {
        let result = if self.closed {
            Err(closed())
        } else {
            self.closed = true;
            self.finalized = true;
            Ok(())
        };
        Box::pin(async move { result })
    }

    fn abort(&mut self) -> IoFuture<'_, ()> {
        if !self.finalized {
            self.buf.clear();
        }
        self.closed = true;
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_sink_finalize_renames_part_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.bin");

        let mut sink = FileSink::create(&target).await.unwrap();
        assert_eq!(sink.part_path(), dir.path().join("out.bin.part"));
        sink.write(b"Hello").await.unwrap();
        sink.write(b" World").await.unwrap();
        assert!(!target.exists());

        sink.finalize().await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"Hello World");
        assert!(!dir.path().join("out.bin.part").exists());
    }

    #[tokio::test]
    async fn file_sink_abort_removes_part_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.bin");

        let mut sink = FileSink::create(&target).await.unwrap();
        sink.write(b"partial").await.unwrap();
        sink.abort().await.unwrap();

        assert!(!target.exists());
        assert!(!sink.part_path().exists());
        // Idempotent.
        sink.abort().await.unwrap();
    }

    #[tokio::test]
    async fn file_sink_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("sub/dir/file.txt");

        let mut sink = FileSink::create(&target).await.unwrap();
        sink.write(b"data").await.unwrap();
        sink.finalize().await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"data");
    }

    #[tokio::test]
    async fn file_sink_rejects_write_after_finalize() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::create(&dir.path().join("x")).await.unwrap();
        sink.finalize().await.unwrap();
        assert!(sink.write(b"late").await.is_err());
        assert!(sink.finalize().await.is_err());
    }

    #[tokio::test]
    async fn file_sink_abort_after_finalize_keeps_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("kept.bin");
        let mut sink = FileSink::create(&target).await.unwrap();
        sink.write(b"done").await.unwrap();
        sink.finalize().await.unwrap();
        sink.abort().await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"done");
    }

    #[tokio::test]
    async fn memory_sink_contents_only_after_finalize() {
        let mut sink = MemorySink::new();
        sink.write(b"abc").await.unwrap();
        assert_eq!(sink.len(), 3);
        assert!(sink.contents().is_none());

        sink.finalize().await.unwrap();
        assert_eq!(sink.contents(), Some(&b"abc"[..]));
        assert!(sink.write(b"d").await.is_err());
        assert_eq!(sink.into_contents(), Some(b"abc".to_vec()));
    }

    #[tokio::test]
    async fn memory_sink_abort_discards() {
        let mut sink = MemorySink::new();
        sink.write(b"abc").await.unwrap();
        sink.abort().await.unwrap();
        assert!(sink.is_empty());
        assert!(!sink.is_finalized());
        assert!(sink.contents().is_none());
        assert!(sink.finalize().await.is_err());
    }
}
