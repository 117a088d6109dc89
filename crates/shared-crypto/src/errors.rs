//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Key material was not valid hex
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The stream ended before the nonce prefix was complete
    #[error("Ciphertext truncated: missing {missing} nonce bytes")]
    TruncatedCiphertext {
        /// Nonce bytes that never arrived
        missing: usize,
    },

    /// Reading the source or writing the destination failed
    #[error("Stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
