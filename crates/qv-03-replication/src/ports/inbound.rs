//! # Driving Port (Inbound API)

use async_trait::async_trait;
use qv_02_blob_store::BlobReader;
use tokio::io::AsyncRead;

use crate::domain::{ReplicationError, ReplicationReport};

/// Store and fetch blobs across the peer network.
#[async_trait]
pub trait ReplicationApi: Send + Sync {
    /// Store `content` under `key` locally, then push it to every known peer.
    ///
    /// Succeeds once the blob is durable locally and a push has been
    /// attempted to every peer; per-peer failures are listed in the report.
    async fn store(
        &self,
        key: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<ReplicationReport, ReplicationError>;

    /// Return `key` from the local store, fetching it from peers on a miss.
    async fn get(&self, key: &str) -> Result<(u64, BlobReader), ReplicationError>;

    /// Whether `key` is stored locally.
    async fn has_local(&self, key: &str) -> bool;

    /// Remove `key` from the local store only.
    async fn delete_local(&self, key: &str) -> Result<(), ReplicationError>;
}
