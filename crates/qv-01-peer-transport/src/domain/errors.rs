//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Ways a remote peer can break the framing contract.
///
/// Every violation is fatal to the connection it happened on: the connection
/// is closed and the peer evicted, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// First byte of a logical unit was neither `TAG_MESSAGE` nor `TAG_STREAM`.
    #[error("unexpected frame tag 0x{0:02x}")]
    UnexpectedTag(u8),

    /// Stream header declared a negative length.
    #[error("negative stream length {0}")]
    NegativeStreamLength(i64),

    /// Control message body exceeds the configured limit.
    #[error("message of {size} bytes exceeds limit of {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Connection ended before the declared stream length was delivered.
    #[error("stream truncated: {received} of {expected} bytes received")]
    StreamTruncated { expected: u64, received: u64 },

    /// Consumer released a stream before reading all of it.
    #[error("stream released with {remaining} unread bytes")]
    StreamAbandoned { remaining: u64 },

    /// Nobody opened an announced stream within the stream timeout.
    #[error("stream not consumed within {0:?}")]
    StreamNotConsumed(Duration),

    /// Stream length does not match the size announced in the control message.
    #[error("announced {announced} bytes but stream carries {actual}")]
    LengthMismatch { announced: u64, actual: u64 },
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] Violation),

    #[error("Failed to bind {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("Failed to dial {addr}: {reason}")]
    DialFailed { addr: String, reason: String },

    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Peer rejected: {0}")]
    Rejected(String),

    #[error("Inbound channel already taken")]
    AlreadyConsumed,
}

impl TransportError {
    /// Whether the connection this error came from must be dropped.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::ProtocolViolation(_) | Self::ConnectionClosed(_)
        )
    }
}
