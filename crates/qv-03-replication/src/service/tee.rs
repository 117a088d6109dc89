//! Reader that keeps a copy of everything it yields.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Wraps a reader and appends every byte read through it to a buffer.
pub(crate) struct TeeReader<'a> {
    inner: &'a mut (dyn AsyncRead + Send + Unpin),
    copy: Vec<u8>,
}

impl<'a> TeeReader<'a> {
    pub(crate) fn new(inner: &'a mut (dyn AsyncRead + Send + Unpin)) -> Self {
        Self {
            inner,
            copy: Vec::new(),
        }
    }

    /// Bytes read so far.
    pub(crate) fn into_copy(self) -> Vec<u8> {
        self.copy
    }
}

impl AsyncRead for TeeReader<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut *this.inner).poll_read(cx, buf))?;
        this.copy.extend_from_slice(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}
