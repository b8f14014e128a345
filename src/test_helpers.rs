//! Shared test helpers for exercising output streams that fail part-way.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// In-memory writer that can fail selected writes or the final shutdown
#[derive(Debug, Default)]
pub(crate) struct FlakyWriter {
    pub written: Vec<u8>,
    fail_on: Option<String>,
    fail_writes: bool,
    fail_shutdown: bool,
}

impl FlakyWriter {
    /// Fail any single write whose buffer contains `marker`; other writes succeed
    pub(crate) fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn failing_shutdown() -> Self {
        Self {
            fail_shutdown: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_all() -> Self {
        Self {
            fail_writes: true,
            fail_shutdown: true,
            ..Self::default()
        }
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    fn rejects(&self, buf: &[u8]) -> bool {
        self.fail_writes
            || self
                .fail_on
                .as_deref()
                .is_some_and(|marker| String::from_utf8_lossy(buf).contains(marker))
    }
}

impl AsyncWrite for FlakyWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.rejects(buf) {
            return Poll::Ready(Err(io::Error::other("device full")));
        }
        this.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.fail_writes {
            return Poll::Ready(Err(io::Error::other("device full")));
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.fail_shutdown {
            return Poll::Ready(Err(io::Error::other("stream closed unexpectedly")));
        }
        Poll::Ready(Ok(()))
    }
}
