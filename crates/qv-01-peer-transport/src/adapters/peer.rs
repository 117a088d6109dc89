//! # Peer Connection Handle
//!
//! A [`Peer`] wraps one bidirectional connection. Writers take the write lock
//! for a whole logical unit; the connection's read loop and at most one
//! stream consumer share the read half through a handover.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf, Take};
use tokio::sync::{mpsc, watch, Mutex, MutexGuard, Notify, OwnedMutexGuard};

use super::idle::IdleTimeout;
use crate::domain::{message_header, stream_header, FrameLimits, TransportError, Violation};

/// Read half of a connection.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of a connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Signals passed from a stream consumer back to the read loop.
#[derive(Default)]
pub(crate) struct StreamHandover {
    /// Woken once per stream when the consumer releases it.
    pub(crate) consumed: Notify,
    /// Unread bytes left when the stream was released (0 when fully read).
    pub(crate) abandoned: AtomicU64,
    /// Bumped when the stream is opened and on every read that moves bytes.
    pub(crate) progress: AtomicU64,
}

/// Handle to one peer connection.
pub struct Peer {
    remote_addr: String,
    local_addr: String,
    outbound: bool,
    max_message_size: usize,
    io_timeout: Duration,
    writer: Mutex<BoxedWriter>,
    pub(crate) reader: Arc<Mutex<BoxedReader>>,
    stream_headers: Mutex<mpsc::Receiver<u64>>,
    pub(crate) stream_header_tx: mpsc::Sender<u64>,
    pub(crate) handover: Arc<StreamHandover>,
    closed: watch::Sender<bool>,
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.local_addr)
            .field("outbound", &self.outbound)
            .finish()
    }
}

impl Peer {
    /// Wrap the two halves of a connection.
    pub fn new<R, W>(
        remote_addr: impl Into<String>,
        local_addr: impl Into<String>,
        outbound: bool,
        reader: R,
        writer: W,
        limits: FrameLimits,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        // One outstanding stream per connection: the read loop waits for
        // consumption before it reads the next tag.
        let (stream_header_tx, stream_headers) = mpsc::channel(1);
        let (closed, _) = watch::channel(false);

        Self {
            remote_addr: remote_addr.into(),
            local_addr: local_addr.into(),
            outbound,
            max_message_size: limits.max_message_size,
            io_timeout: limits.io_timeout,
            writer: Mutex::new(Box::new(IdleTimeout::new(writer, limits.io_timeout))),
            reader: Arc::new(Mutex::new(Box::new(reader))),
            stream_headers: Mutex::new(stream_headers),
            stream_header_tx,
            handover: Arc::new(StreamHandover::default()),
            closed,
        }
    }

    /// Address of the remote end.
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Address of our end of the connection.
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    /// Whether we dialed this peer (as opposed to accepting it).
    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    /// Whether [`Peer::close`] has been called or the read loop has ended.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the peer is closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Mark the connection closed and shut down the write half.
    ///
    /// The write half is only shut down if no unit is being written; the
    /// socket is released when the last handle is dropped either way.
    pub async fn close(&self) {
        self.closed.send_replace(true);
        if let Ok(mut writer) = self.writer.try_lock() {
            let _ = writer.shutdown().await;
        }
    }

    /// Start an atomic outbound unit.
    ///
    /// Holds the write lock until the unit is dropped, so nothing else is
    /// written to this peer in between.
    pub async fn begin_unit(&self) -> Result<OutboundUnit<'_>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(self.remote_addr.clone()));
        }
        Ok(OutboundUnit {
            writer: self.writer.lock().await,
            max_message_size: self.max_message_size,
        })
    }

    /// Send one control message.
    pub async fn send_message(&self, body: &[u8]) -> Result<(), TransportError> {
        let mut unit = self.begin_unit().await?;
        unit.write_message(body).await?;
        unit.finish().await
    }

    /// Send one content stream.
    pub async fn send_stream(&self, content: &[u8]) -> Result<(), TransportError> {
        let mut unit = self.begin_unit().await?;
        unit.write_stream_header(content.len() as u64).await?;
        unit.write_raw(content).await?;
        unit.finish().await
    }

    /// Send a control message immediately followed by the stream it announces.
    pub async fn send_message_with_stream(
        &self,
        body: &[u8],
        content: &[u8],
    ) -> Result<(), TransportError> {
        let mut unit = self.begin_unit().await?;
        unit.write_message(body).await?;
        unit.write_stream_header(content.len() as u64).await?;
        unit.write_raw(content).await?;
        unit.finish().await
    }

    /// Wait for the next inbound stream and take the read half.
    ///
    /// The connection's read loop stays paused until the returned stream is
    /// finished or dropped.
    ///
    /// # Errors
    ///
    /// - `TransportError::Timeout` if no stream header arrives within `wait`
    /// - `TransportError::ConnectionClosed` if the read loop has ended
    pub async fn open_stream(&self, wait: Duration) -> Result<InboundStream, TransportError> {
        let length = {
            let mut headers = self.stream_headers.lock().await;
            match tokio::time::timeout(wait, headers.recv()).await {
                Err(_) => return Err(TransportError::Timeout(wait)),
                Ok(None) => return Err(TransportError::ConnectionClosed(self.remote_addr.clone())),
                Ok(Some(length)) => length,
            }
        };

        // The read loop released the read half before publishing the header.
        let reader = Arc::clone(&self.reader).lock_owned().await;
        self.handover.progress.fetch_add(1, Ordering::SeqCst);

        Ok(InboundStream {
            inner: IdleTimeout::new(GuardedReader(reader), self.io_timeout).take(length),
            length,
            from: self.remote_addr.clone(),
            handover: Arc::clone(&self.handover),
            released: false,
        })
    }
}

/// Exclusive access to a peer's write half for one logical unit.
pub struct OutboundUnit<'a> {
    writer: MutexGuard<'a, BoxedWriter>,
    max_message_size: usize,
}

impl OutboundUnit<'_> {
    /// Write a framed control message.
    pub async fn write_message(&mut self, body: &[u8]) -> Result<(), TransportError> {
        let header = message_header(body.len(), self.max_message_size)?;
        self.writer.write_all(&header).await?;
        self.writer.write_all(body).await?;
        Ok(())
    }

    /// Write a stream header; exactly `length` bytes must follow.
    pub async fn write_stream_header(&mut self, length: u64) -> Result<(), TransportError> {
        self.writer.write_all(&stream_header(length)).await?;
        Ok(())
    }

    /// Write bytes with no framing.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(bytes).await?;
        Ok(())
    }

    /// The underlying writer, for streaming content produced elsewhere.
    pub fn writer(&mut self) -> &mut BoxedWriter {
        &mut self.writer
    }

    /// Flush and release the write lock.
    pub async fn finish(mut self) -> Result<(), TransportError> {
        self.writer.flush().await?;
        Ok(())
    }
}

struct GuardedReader(OwnedMutexGuard<BoxedReader>);

impl AsyncRead for GuardedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().0).poll_read(cx, buf)
    }
}

/// One inbound content stream, bounded to its declared length.
///
/// Reading past the declared length yields EOF; the connection ending early
/// yields an `UnexpectedEof` error carrying [`Violation::StreamTruncated`],
/// and a read that stalls for the connection's I/O timeout fails with
/// `TimedOut`.
/// Dropping the stream hands the connection back to the read loop; dropping
/// it with unread bytes poisons the connection.
pub struct InboundStream {
    inner: Take<IdleTimeout<GuardedReader>>,
    length: u64,
    from: String,
    handover: Arc<StreamHandover>,
    released: bool,
}

impl InboundStream {
    /// Declared stream length.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the stream carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }

    /// Remote address the stream arrives from.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Check the declared length against the size a control message announced.
    pub fn expect_len(&self, announced: u64) -> Result<(), Violation> {
        if self.length != announced {
            return Err(Violation::LengthMismatch {
                announced,
                actual: self.length,
            });
        }
        Ok(())
    }

    /// Signal "stream consumed" and hand the connection back to the read loop.
    ///
    /// # Errors
    ///
    /// Returns `Violation::StreamAbandoned` if bytes are left unread; the
    /// connection is torn down in that case.
    pub fn finish(mut self) -> Result<u64, TransportError> {
        let remaining = self.remaining();
        self.release(remaining);
        if remaining > 0 {
            return Err(Violation::StreamAbandoned { remaining }.into());
        }
        Ok(self.length)
    }

    fn release(&mut self, remaining: u64) {
        if self.released {
            return;
        }
        self.released = true;
        self.handover.abandoned.store(remaining, Ordering::SeqCst);
        self.handover.consumed.notify_one();
    }
}

impl Drop for InboundStream {
    fn drop(&mut self) {
        let remaining = self.remaining();
        self.release(remaining);
    }
}

impl AsyncRead for InboundStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = this.inner.limit();
        if remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        if buf.filled().len() == before {
            let truncated = Violation::StreamTruncated {
                expected: this.length,
                received: this.length - remaining,
            };
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                truncated,
            )));
        }
        this.handover.progress.fetch_add(1, Ordering::Relaxed);
        Poll::Ready(Ok(()))
    }
}
