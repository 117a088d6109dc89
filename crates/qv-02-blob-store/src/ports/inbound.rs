//! # Driving Port (Inbound API)

use async_trait::async_trait;
use shared_crypto::SecretKey;
use tokio::io::AsyncRead;

use crate::domain::BlobStoreError;

/// Reader over one stored blob.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Local blob persistence.
///
/// Implementations must tolerate concurrent calls: the replication service
/// writes from its dispatch task while callers read and write from theirs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob is stored under `key`.
    async fn has(&self, key: &str) -> bool;

    /// Open the blob stored under `key`, returning its size and a reader.
    ///
    /// # Errors
    ///
    /// `BlobStoreError::NotFound` if nothing is stored under `key`.
    async fn read(&self, key: &str) -> Result<(u64, BlobReader), BlobStoreError>;

    /// Store everything `reader` yields under `key`, replacing any previous
    /// blob. Returns the number of bytes written.
    async fn write(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError>;

    /// Decrypt `reader` with `secret` and store the plaintext under `key`.
    /// Returns the number of plaintext bytes written.
    async fn write_decrypted(
        &self,
        secret: &SecretKey,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError>;

    /// Remove the blob stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;

    /// Remove every stored blob.
    async fn clear(&self) -> Result<(), BlobStoreError>;
}
