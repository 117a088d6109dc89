//! Replication error types.

use std::time::Duration;

use qv_01_peer_transport::{TransportError, Violation};
use qv_02_blob_store::BlobStoreError;
use shared_crypto::CryptoError;
use thiserror::Error;

/// Errors surfaced by the replication service.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Malformed or unknown envelope.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Store error: {0}")]
    Store(#[from] BlobStoreError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A peer broke the replication protocol (e.g. announced size mismatch).
    #[error("Protocol violation by {peer}: {violation}")]
    ProtocolViolation { peer: String, violation: Violation },

    /// Neither the local store nor any peer holds the key.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Some peers never answered and no content arrived in time.
    #[error("Retrieval of '{key}' timed out after {after:?}")]
    Timeout { key: String, after: Duration },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Message from an address that is not in the peer registry.
    #[error("Unknown peer: {0}")]
    UnknownPeer(String),
}

impl ReplicationError {
    /// Whether the connection involved must be dropped.
    pub fn is_fatal_to_peer(&self) -> bool {
        match self {
            Self::ProtocolViolation { .. } => true,
            Self::Transport(e) => {
                e.is_fatal_to_connection() || matches!(e, TransportError::Timeout(_))
            }
            // Stream I/O failed mid-write; the connection is out of sync.
            Self::Store(BlobStoreError::Io(_)) | Self::Store(BlobStoreError::Crypto(_)) => true,
            Self::Crypto(_) => true,
            _ => false,
        }
    }
}
