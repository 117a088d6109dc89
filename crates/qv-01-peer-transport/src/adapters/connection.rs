//! Per-connection read loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::peer::Peer;
use crate::domain::{
    message_body_len, parse_stream_length, FrameLimits, FrameTag, Rpc, TransportError, Violation,
};
use crate::ports::PeerHandler;

/// Why a read loop stopped.
#[derive(Debug)]
enum Exit {
    /// Remote closed cleanly between logical units.
    Eof,
    /// Inbound channel receiver was dropped.
    ConsumerGone,
    Error(TransportError),
}

/// Run the read loop for `peer` until the connection ends, the peer is
/// closed, or `shutdown` flips to `true`.
///
/// On exit the peer is closed and `handler.on_peer_disconnected` is called
/// exactly once.
pub fn spawn_read_loop(
    peer: Arc<Peer>,
    inbound: mpsc::Sender<Rpc>,
    limits: FrameLimits,
    handler: Arc<dyn PeerHandler>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let remote = peer.remote_addr().to_string();

        let exit = tokio::select! {
            exit = read_units(&peer, &inbound, limits) => Some(exit),
            _ = peer.closed() => None,
            _ = stopped(&mut shutdown) => None,
        };

        match exit {
            Some(Exit::Eof) => info!("[qv-01] Peer {} closed the connection", remote),
            Some(Exit::ConsumerGone) => {
                debug!("[qv-01] Inbound channel closed, dropping {}", remote)
            }
            Some(Exit::Error(e)) => {
                warn!(peer = %remote, error = %e, "[qv-01] Connection dropped")
            }
            None => debug!("[qv-01] Read loop for {} stopped", remote),
        }

        peer.close().await;
        handler.on_peer_disconnected(&remote);
    })
}

/// Resolves once `shutdown` reads `true` or its sender is gone.
///
/// Returns `()` so no `watch::Ref` ends up in a `select!` output.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn read_units(
    peer: &Arc<Peer>,
    inbound: &mpsc::Sender<Rpc>,
    limits: FrameLimits,
) -> Exit {
    loop {
        match read_unit(peer, inbound, limits).await {
            Ok(true) => continue,
            Ok(false) => return Exit::Eof,
            Err(TransportError::ConnectionClosed(_)) => return Exit::ConsumerGone,
            Err(e) => return Exit::Error(e),
        }
    }
}

/// `read_exact` bounded by the connection's I/O timeout.
async fn read_within<R>(
    reader: &mut R,
    buf: &mut [u8],
    limit: Duration,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    tokio::time::timeout(limit, reader.read_exact(buf))
        .await
        .map_err(|_| TransportError::Timeout(limit))??;
    Ok(())
}

/// Wait until the consumer releases the current stream.
///
/// Fails only if a whole `stream_timeout` window passes in which the stream
/// was neither opened nor read from.
async fn await_consumption(peer: &Peer, window: Duration) -> Result<(), Violation> {
    let mut seen = peer.handover.progress.load(Ordering::SeqCst);
    loop {
        tokio::select! {
            _ = peer.handover.consumed.notified() => return Ok(()),
            _ = tokio::time::sleep(window) => {
                let now = peer.handover.progress.load(Ordering::SeqCst);
                if now == seen {
                    return Err(Violation::StreamNotConsumed(window));
                }
                seen = now;
            }
        }
    }
}

/// Read one logical unit. Returns `Ok(false)` on a clean EOF before the tag.
///
/// Waiting for the tag is unbounded; every read after it is held to
/// `limits.io_timeout`.
async fn read_unit(
    peer: &Arc<Peer>,
    inbound: &mpsc::Sender<Rpc>,
    limits: FrameLimits,
) -> Result<bool, TransportError> {
    let mut reader = peer.reader.lock().await;

    let mut tag = [0u8; 1];
    if reader.read(&mut tag).await? == 0 {
        return Ok(false);
    }

    match FrameTag::try_from(tag[0])? {
        FrameTag::Message => {
            let mut raw = [0u8; 4];
            read_within(&mut *reader, &mut raw, limits.io_timeout).await?;
            let size = message_body_len(raw, limits.max_message_size)?;

            let mut payload = vec![0u8; size];
            read_within(&mut *reader, &mut payload, limits.io_timeout).await?;
            drop(reader);

            let rpc = Rpc {
                from: peer.remote_addr().to_string(),
                payload,
            };
            inbound
                .send(rpc)
                .await
                .map_err(|_| TransportError::ConnectionClosed(peer.remote_addr().to_string()))?;
        }
        FrameTag::Stream => {
            let mut raw = [0u8; 8];
            read_within(&mut *reader, &mut raw, limits.io_timeout).await?;
            let length = parse_stream_length(raw)?;

            // Hand the read half to the consumer.
            drop(reader);
            peer.stream_header_tx
                .send(length)
                .await
                .map_err(|_| TransportError::ConnectionClosed(peer.remote_addr().to_string()))?;

            debug!(peer = %peer.remote_addr(), length, "[qv-01] Stream awaiting consumer");

            await_consumption(peer, limits.stream_timeout).await?;

            let remaining = peer.handover.abandoned.swap(0, Ordering::SeqCst);
            if remaining > 0 {
                return Err(Violation::StreamAbandoned { remaining }.into());
            }
        }
    }

    Ok(true)
}
