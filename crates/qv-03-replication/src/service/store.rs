//! Replication: store locally, then push to every peer.

use std::sync::Arc;

use futures::future::join_all;
use qv_01_peer_transport::Peer;
use shared_crypto::{encrypt_copy, ENCRYPTION_OVERHEAD};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::tee::TeeReader;
use super::FileServer;
use crate::domain::{Envelope, ReplicationError, ReplicationReport};

impl FileServer {
    pub(super) async fn replicate(
        &self,
        key: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<ReplicationReport, ReplicationError> {
        crate::domain::check_key(key)?;

        let mut tee = TeeReader::new(content);
        let size = self.store.write(key, &mut tee).await?;
        let plaintext = tee.into_copy();
        info!(key, bytes = size, "[qv-03] 💾 Stored locally");

        let mut ciphertext = Vec::with_capacity(plaintext.len() + ENCRYPTION_OVERHEAD as usize);
        encrypt_copy(&self.config.enc_key, &mut plaintext.as_slice(), &mut ciphertext).await?;

        let announce = Envelope::StoreAnnounce {
            key: key.to_string(),
            size: ciphertext.len() as i64,
        }
        .encode()?;

        let peers = self.registry.snapshot();
        if peers.is_empty() {
            debug!(key, "[qv-03] No peers to replicate to");
        }

        let outcomes = join_all(
            peers
                .iter()
                .map(|peer| self.push_to(peer, &announce, &ciphertext)),
        )
        .await;

        let mut report = ReplicationReport {
            key: key.to_string(),
            size,
            delivered: Vec::new(),
            failed: Vec::new(),
        };
        for (peer, outcome) in peers.iter().zip(outcomes) {
            let addr = peer.remote_addr().to_string();
            match outcome {
                Ok(()) => report.delivered.push(addr),
                Err(e) => {
                    warn!(peer = %addr, key, error = %e, "[qv-03] Replication to peer failed");
                    self.drop_peer(peer).await;
                    report.failed.push(addr);
                }
            }
        }

        info!(
            key,
            bytes = size,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "[qv-03] 📤 Replicated"
        );
        Ok(report)
    }

    /// Announcement and its content as one unit on `peer`.
    ///
    /// Only a write that stalls for the transport's I/O timeout fails the
    /// push; a slow peer that keeps draining gets the whole blob.
    async fn push_to(
        &self,
        peer: &Arc<Peer>,
        announce: &[u8],
        ciphertext: &[u8],
    ) -> Result<(), ReplicationError> {
        peer.send_message_with_stream(announce, ciphertext).await?;
        Ok(())
    }
}
