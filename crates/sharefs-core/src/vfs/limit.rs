//! Per-transfer byte cap as a composable writer decorator.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use sharefs_types::VfsError;
use tokio::io::AsyncWrite;

/// Wraps a byte sink and aborts the transfer once a cumulative byte cap
/// is crossed.
///
/// Enforcement triggers after, not before, the boundary: the whole
/// offending chunk is forwarded to the inner sink first, then the write
/// reports [`VfsError::UploadLimitExceeded`] (as an `io::Error` of kind
/// `FileTooLarge`) and every later write fails the same way. Flush and
/// shutdown still reach the inner sink so the handle is released; bytes
/// already written stay where they landed.
#[derive(Debug)]
pub struct LimitedWriter<W> {
    inner: W,
    limit: u64,
    written: u64,
    exceeded: bool,
}

impl<W> LimitedWriter<W> {
    /// Cap writes through `inner` at `limit` cumulative bytes.
    pub fn new(inner: W, limit: u64) -> Self {
        Self {
            inner,
            limit,
            written: 0,
            exceeded: false,
        }
    }

    /// Cumulative bytes accepted by the inner sink.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Whether the cap has been crossed.
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn limit_error(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::FileTooLarge,
            VfsError::UploadLimitExceeded { limit: self.limit },
        )
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for LimitedWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.exceeded {
            return Poll::Ready(Err(this.limit_error()));
        }
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(accepted)) => {
                this.written += accepted as u64;
                if this.written > this.limit {
                    // the offending chunk has already reached the sink
                    this.exceeded = true;
                    Poll::Ready(Err(this.limit_error()))
                } else {
                    Poll::Ready(Ok(accepted))
                }
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
