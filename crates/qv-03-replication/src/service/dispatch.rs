//! Inbound dispatch: decode control messages and route them to handlers.

use std::sync::Arc;

use qv_01_peer_transport::{Peer, Rpc, Violation};
use shared_crypto::{encrypt_copy, ENCRYPTION_OVERHEAD};
use tracing::{debug, info, warn};

use super::FileServer;
use crate::domain::{Envelope, ReplicationError};

/// Why a stream is arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    /// Pushed by a peer that stored the blob.
    Replica,
    /// Answer to one of our own `GetRequest`s.
    Requested,
}

impl FileServer {
    /// Route one control message. Anything that touches a stream or the
    /// store runs in its own task, so this never blocks the dispatch loop.
    pub(super) fn handle_rpc(self: &Arc<Self>, rpc: Rpc) {
        let envelope = match Envelope::decode(&rpc.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(peer = %rpc.from, error = %e, "[qv-03] Dropping undecodable message");
                return;
            }
        };

        let Some(peer) = self.registry.get(&rpc.from) else {
            warn!(
                error = %ReplicationError::UnknownPeer(rpc.from.clone()),
                kind = envelope.kind(),
                "[qv-03] Dropping message"
            );
            return;
        };

        debug!(
            peer = %rpc.from,
            kind = envelope.kind(),
            key = envelope.key(),
            "[qv-03] Dispatching"
        );

        match envelope {
            Envelope::StoreAnnounce { key, size } => {
                self.spawn_receive(peer, key, size, Arrival::Replica)
            }
            Envelope::GetRequest { key } => self.spawn_get_reply(peer, key),
            Envelope::GetResponse { key, size } => {
                self.spawn_receive(peer, key, size, Arrival::Requested)
            }
            Envelope::NotFound { key } => {
                debug!(peer = %rpc.from, key = %key, "[qv-03] Peer does not hold key");
                self.pending.answer(&key, peer.remote_addr(), false);
            }
        }
    }

    /// Consume an announced stream off the dispatch task.
    fn spawn_receive(self: &Arc<Self>, peer: Arc<Peer>, key: String, size: i64, why: Arrival) {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            let received = server.receive_content(&peer, &key, size).await;
            if why == Arrival::Requested {
                server.pending.answer(&key, peer.remote_addr(), received.is_ok());
            }

            match received {
                Ok(bytes) if why == Arrival::Replica => {
                    info!(
                        peer = %peer.remote_addr(),
                        key = %key,
                        bytes,
                        "[qv-03] 📥 Stored replica"
                    );
                }
                Ok(bytes) => {
                    info!(
                        peer = %peer.remote_addr(),
                        key = %key,
                        bytes,
                        "[qv-03] 📥 Received requested blob"
                    );
                }
                Err(e) => server.peer_failed(&peer, &key, e).await,
            }
        });
    }

    /// Consume the stream announced by a `StoreAnnounce` or `GetResponse`
    /// and store its plaintext under `key`.
    ///
    /// Each read from the peer is held to the transport's I/O timeout; the
    /// transfer as a whole may take as long as the peer keeps sending.
    async fn receive_content(
        &self,
        peer: &Arc<Peer>,
        key: &str,
        size: i64,
    ) -> Result<u64, ReplicationError> {
        let violation = |violation| ReplicationError::ProtocolViolation {
            peer: peer.remote_addr().to_string(),
            violation,
        };

        let announced =
            u64::try_from(size).map_err(|_| violation(Violation::NegativeStreamLength(size)))?;
        let mut stream = peer.open_stream(self.config.io_timeout).await?;
        stream.expect_len(announced).map_err(violation)?;

        let written = self
            .store
            .write_decrypted(&self.config.enc_key, key, &mut stream)
            .await?;
        stream.finish()?;
        Ok(written)
    }

    /// Answer a `GetRequest` off the dispatch task.
    fn spawn_get_reply(self: &Arc<Self>, peer: Arc<Peer>, key: String) {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = server.reply_to_get(&peer, &key).await {
                server.peer_failed(&peer, &key, e).await;
            }
        });
    }

    /// `GetResponse` plus the encrypted blob if stored locally, `NotFound`
    /// otherwise.
    async fn reply_to_get(&self, peer: &Peer, key: &str) -> Result<(), ReplicationError> {
        let (size, mut reader) = match self.store.read(key).await {
            Ok(found) => found,
            Err(qv_02_blob_store::BlobStoreError::NotFound(_)) => {
                let reply = Envelope::NotFound {
                    key: key.to_string(),
                }
                .encode()?;
                debug!(peer = %peer.remote_addr(), key, "[qv-03] Answering NotFound");
                peer.send_message(&reply).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let wire_len = size + ENCRYPTION_OVERHEAD;
        let reply = Envelope::GetResponse {
            key: key.to_string(),
            size: wire_len as i64,
        }
        .encode()?;

        let mut unit = peer.begin_unit().await?;
        unit.write_message(&reply).await?;
        unit.write_stream_header(wire_len).await?;
        let written = encrypt_copy(&self.config.enc_key, &mut reader, unit.writer()).await?;
        if written != wire_len {
            // The header already promised `wire_len` bytes.
            return Err(ReplicationError::ProtocolViolation {
                peer: peer.remote_addr().to_string(),
                violation: Violation::LengthMismatch {
                    announced: wire_len,
                    actual: written,
                },
            });
        }
        unit.finish().await?;

        info!(peer = %peer.remote_addr(), key, bytes = size, "[qv-03] 📤 Served blob");
        Ok(())
    }

    async fn peer_failed(&self, peer: &Peer, key: &str, error: ReplicationError) {
        warn!(peer = %peer.remote_addr(), key, error = %error, "[qv-03] Handler failed");
        if error.is_fatal_to_peer() {
            self.drop_peer(peer).await;
        }
    }
}
