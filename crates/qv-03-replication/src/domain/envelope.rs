//! Control message envelope.
//!
//! Bodies are encoded with bincode (fixed-width integers, little endian).
//! Bulk content never travels inside an envelope: variants that carry a
//! `size` are followed on the same connection by exactly one stream of that
//! many encrypted bytes.

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::errors::ReplicationError;

/// Longest accepted blob key, in bytes.
pub const MAX_KEY_LEN: usize = 4 * 1024;

/// Upper bound on an encoded envelope.
pub const MAX_ENVELOPE_SIZE: u64 = 64 * 1024;

/// Control message exchanged between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    /// `size` encrypted bytes for `key` follow as one stream.
    StoreAnnounce { key: String, size: i64 },
    /// Push `key` back if you hold it.
    GetRequest { key: String },
    /// Reply to `GetRequest`: `size` encrypted bytes for `key` follow.
    GetResponse { key: String, size: i64 },
    /// Reply to `GetRequest`: the responder does not hold `key`.
    NotFound { key: String },
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_ENVELOPE_SIZE)
        .reject_trailing_bytes()
}

impl Envelope {
    /// Blob key the message refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::StoreAnnounce { key, .. }
            | Self::GetRequest { key }
            | Self::GetResponse { key, .. }
            | Self::NotFound { key } => key,
        }
    }

    /// Variant name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreAnnounce { .. } => "StoreAnnounce",
            Self::GetRequest { .. } => "GetRequest",
            Self::GetResponse { .. } => "GetResponse",
            Self::NotFound { .. } => "NotFound",
        }
    }

    /// Size of the stream that follows this message, if any.
    pub fn stream_size(&self) -> Option<i64> {
        match self {
            Self::StoreAnnounce { size, .. } | Self::GetResponse { size, .. } => Some(*size),
            Self::GetRequest { .. } | Self::NotFound { .. } => None,
        }
    }

    /// Encode for the wire.
    ///
    /// # Errors
    ///
    /// - `ReplicationError::InvalidKey` for empty keys or keys over [`MAX_KEY_LEN`]
    /// - `ReplicationError::Serialization` if encoding fails
    pub fn encode(&self) -> Result<Vec<u8>, ReplicationError> {
        check_key(self.key())?;
        codec()
            .serialize(self)
            .map_err(|e| ReplicationError::Serialization(e.to_string()))
    }

    /// Decode a received body.
    ///
    /// # Errors
    ///
    /// `ReplicationError::Serialization` for truncated input, unknown variant
    /// tags, trailing bytes or a negative stream size.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReplicationError> {
        let envelope: Self = codec()
            .deserialize(bytes)
            .map_err(|e| ReplicationError::Serialization(e.to_string()))?;

        if let Some(size) = envelope.stream_size() {
            if size < 0 {
                return Err(ReplicationError::Serialization(format!(
                    "{} for '{}' announces negative size {}",
                    envelope.kind(),
                    envelope.key(),
                    size
                )));
            }
        }
        Ok(envelope)
    }
}

/// Reject keys that cannot be stored or announced.
pub(crate) fn check_key(key: &str) -> Result<(), ReplicationError> {
    if key.is_empty() {
        return Err(ReplicationError::InvalidKey("empty key".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ReplicationError::InvalidKey(format!(
            "key of {} bytes exceeds limit of {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Envelope> {
        vec![
            Envelope::StoreAnnounce {
                key: "photo.jpg".into(),
                size: 1024,
            },
            Envelope::GetRequest {
                key: "photo.jpg".into(),
            },
            Envelope::GetResponse {
                key: "photo.jpg".into(),
                size: 0,
            },
            Envelope::NotFound {
                key: "photo.jpg".into(),
            },
        ]
    }

    #[test]
    fn test_round_trip_every_variant() {
        for envelope in all_variants() {
            let bytes = envelope.encode().unwrap();
            assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
        }
    }

    #[test]
    fn test_truncated_input_rejected() {
        let bytes = Envelope::GetRequest {
            key: "some key".into(),
        }
        .encode()
        .unwrap();

        for cut in 0..bytes.len() {
            assert!(
                matches!(
                    Envelope::decode(&bytes[..cut]),
                    Err(ReplicationError::Serialization(_))
                ),
                "prefix of {cut} bytes decoded"
            );
        }
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let mut bytes = Envelope::NotFound { key: "k".into() }.encode().unwrap();
        // Variant index is the leading u32.
        bytes[..4].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(ReplicationError::Serialization(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Envelope::GetRequest { key: "k".into() }.encode().unwrap();
        bytes.push(0);
        assert!(Envelope::decode(&bytes).is_err());
    }

    #[test]
    fn test_negative_size_rejected() {
        let bytes = codec()
            .serialize(&Envelope::StoreAnnounce {
                key: "k".into(),
                size: -1,
            })
            .unwrap();
        assert!(matches!(
            Envelope::decode(&bytes),
            Err(ReplicationError::Serialization(_))
        ));
    }

    #[test]
    fn test_key_limits() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            Envelope::GetRequest { key: long }.encode(),
            Err(ReplicationError::InvalidKey(_))
        ));
        assert!(Envelope::GetRequest {
            key: "x".repeat(MAX_KEY_LEN)
        }
        .encode()
        .is_ok());
        assert!(matches!(
            Envelope::NotFound { key: String::new() }.encode(),
            Err(ReplicationError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_accessors() {
        let announce = &all_variants()[0];
        assert_eq!(announce.key(), "photo.jpg");
        assert_eq!(announce.kind(), "StoreAnnounce");
        assert_eq!(announce.stream_size(), Some(1024));
        assert_eq!(all_variants()[1].stream_size(), None);
    }
}
