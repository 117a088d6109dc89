//! Retrieval: local hit, or broadcast a request and wait for peers.

use futures::future::join_all;
use qv_02_blob_store::BlobReader;
use tracing::{debug, info, warn};

use super::FileServer;
use crate::domain::{check_key, Envelope, ReplicationError};

impl FileServer {
    pub(super) async fn retrieve(&self, key: &str) -> Result<(u64, BlobReader), ReplicationError> {
        check_key(key)?;

        if self.store.has(key).await {
            debug!(key, "[qv-03] Serving from local store");
            return Ok(self.store.read(key).await?);
        }

        let peers = self.registry.snapshot();
        if peers.is_empty() {
            return Err(ReplicationError::NotFound(key.to_string()));
        }

        info!(
            key,
            peers = peers.len(),
            "[qv-03] 🔎 Not stored locally, asking the network"
        );

        // Register before broadcasting so no reply can be missed.
        let mut ticket = self
            .pending
            .register(key, peers.iter().map(|peer| peer.remote_addr()));
        let request = Envelope::GetRequest {
            key: key.to_string(),
        }
        .encode()?;

        let sends = join_all(peers.iter().map(|peer| peer.send_message(&request))).await;

        for (peer, sent) in peers.iter().zip(sends) {
            if let Err(e) = sent {
                warn!(
                    peer = %peer.remote_addr(),
                    key,
                    error = %e,
                    "[qv-03] Request to peer failed"
                );
                // A peer that never got the request will not answer.
                self.drop_peer(peer).await;
            }
        }

        let timed_out = match tokio::time::timeout(
            self.config.retrieval_timeout,
            &mut ticket.completion,
        )
        .await
        {
            Ok(_) => false,
            Err(_) => {
                self.pending.abandon(&ticket);
                true
            }
        };

        if self.store.has(key).await {
            info!(key, "[qv-03] 📥 Fetched from the network");
            return Ok(self.store.read(key).await?);
        }

        if timed_out {
            Err(ReplicationError::Timeout {
                key: key.to_string(),
                after: self.config.retrieval_timeout,
            })
        } else {
            Err(ReplicationError::NotFound(key.to_string()))
        }
    }
}
