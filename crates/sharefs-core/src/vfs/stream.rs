//! Byte streams handed to the protocol engine.

use std::io::{self, Cursor, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWrite, ReadBuf};

use crate::config::Share;

use super::limit::LimitedWriter;
use super::quota::QuotaTracker;

/// A download stream: either a physical file or a rendered synthetic body.
#[derive(Debug)]
pub enum FileReader {
    Physical(File),
    Synthetic(Cursor<Vec<u8>>),
}

impl FileReader {
    /// Stream a rendered body, optionally from a byte offset.
    pub(crate) fn synthetic(body: String, start: Option<u64>) -> Self {
        let bytes = body.into_bytes();
        let len = bytes.len() as u64;
        let mut cursor = Cursor::new(bytes);
        if let Some(start) = start {
            cursor.set_position(start.min(len));
        }
        Self::Synthetic(cursor)
    }

    /// Open a physical file, optionally resuming from a byte offset.
    pub(crate) async fn physical(path: &Path, start: Option<u64>) -> io::Result<Self> {
        let mut file = File::open(path).await?;
        if let Some(start) = start {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(Self::Physical(file))
    }
}

impl AsyncRead for FileReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Physical(file) => Pin::new(file).poll_read(cx, buf),
            Self::Synthetic(cursor) => Pin::new(cursor).poll_read(cx, buf),
        }
    }
}

#[derive(Debug)]
enum SinkWriter {
    Plain(File),
    Limited(LimitedWriter<File>),
}

/// An upload sink: the destination file, wrapped by a byte-cap limiter
/// when the session carries one.
///
/// Releasing the sink (clean close and mid-stream abort alike) invalidates
/// the share's cached size when the share has a quota; partial files stay
/// on disk.
#[derive(Debug)]
pub struct UploadSink {
    writer: SinkWriter,
    quota_hook: Option<(Arc<QuotaTracker>, Arc<Share>)>,
}

impl UploadSink {
    pub(crate) fn new(
        file: File,
        limit: Option<u64>,
        quota_hook: Option<(Arc<QuotaTracker>, Arc<Share>)>,
    ) -> Self {
        let writer = match limit {
            Some(limit) => SinkWriter::Limited(LimitedWriter::new(file, limit)),
            None => SinkWriter::Plain(file),
        };
        Self { writer, quota_hook }
    }

    /// Whether the per-transfer cap has been crossed.
    pub fn is_limit_exceeded(&self) -> bool {
        match &self.writer {
            SinkWriter::Plain(_) => false,
            SinkWriter::Limited(limited) => limited.is_exceeded(),
        }
    }
}

impl AsyncWrite for UploadSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().writer {
            SinkWriter::Plain(file) => Pin::new(file).poll_write(cx, buf),
            SinkWriter::Limited(limited) => Pin::new(limited).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().writer {
            SinkWriter::Plain(file) => Pin::new(file).poll_flush(cx),
            SinkWriter::Limited(limited) => Pin::new(limited).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().writer {
            SinkWriter::Plain(file) => Pin::new(file).poll_shutdown(cx),
            SinkWriter::Limited(limited) => Pin::new(limited).poll_shutdown(cx),
        }
    }
}

impl Drop for UploadSink {
    fn drop(&mut self) {
        if let Some((tracker, share)) = &self.quota_hook {
            tracker.invalidate(share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShareSet;
    use sharefs_types::ShareConfig;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn synthetic_reader_streams_the_body() {
        let mut reader = FileReader::synthetic("permissions=r\n".into(), None);
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "permissions=r\n");
    }

    #[tokio::test]
    async fn synthetic_reader_honors_offset() {
        let mut reader = FileReader::synthetic("0123456789".into(), Some(6));
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "6789");

        // offsets beyond the end read nothing rather than failing
        let mut reader = FileReader::synthetic("abc".into(), Some(99));
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn physical_reader_honors_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let mut reader = FileReader::physical(&path, Some(6)).await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "world");
    }

    #[tokio::test]
    async fn sink_release_invalidates_quota_sample() {
        let dir = TempDir::new().unwrap();
        let mut config = ShareConfig::new("drop", dir.path());
        config.max_size_bytes = Some(10_000);
        let shares = ShareSet::build([config]).unwrap();
        let share = shares.get("drop").unwrap();
        let tracker = Arc::new(QuotaTracker::new());

        // prime the cache while the share is empty
        assert_eq!(tracker.cached_size(&shares, share).await, 0);

        let file = File::create(dir.path().join("up.bin")).await.unwrap();
        let mut sink = UploadSink::new(
            file,
            None,
            Some((Arc::clone(&tracker), Arc::clone(share))),
        );
        sink.write_all(&[0u8; 64]).await.unwrap();
        sink.shutdown().await.unwrap();
        drop(sink);

        // the stale zero sample was dropped with the sink
        assert_eq!(tracker.cached_size(&shares, share).await, 64);
    }

    #[tokio::test]
    async fn sink_without_quota_keeps_samples() {
        let dir = TempDir::new().unwrap();
        let shares = ShareSet::build([ShareConfig::new("plain", dir.path())]).unwrap();
        let share = shares.get("plain").unwrap();
        let tracker = Arc::new(QuotaTracker::new());
        assert_eq!(tracker.cached_size(&shares, share).await, 0);

        let file = File::create(dir.path().join("up.bin")).await.unwrap();
        let mut sink = UploadSink::new(file, None, None);
        sink.write_all(&[0u8; 64]).await.unwrap();
        sink.shutdown().await.unwrap();
        drop(sink);

        // no quota, no invalidation: the sample stays until its TTL lapses
        assert_eq!(tracker.cached_size(&shares, share).await, 0);
    }
}
