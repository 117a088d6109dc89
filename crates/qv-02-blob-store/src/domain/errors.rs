//! Blob store error types.

use shared_crypto::CryptoError;
use thiserror::Error;

/// Errors returned by [`BlobStore`](crate::BlobStore) implementations.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// No blob is stored under this key.
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decrypting a replicated stream failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Key cannot be mapped to a path under the storage root.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
