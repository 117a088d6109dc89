//! # BLAKE3 Key Derivation
//!
//! Turns a human-shareable passphrase into a network key, so every node of a
//! deployment can be configured with the same secret without handling hex.

use crate::symmetric::SecretKey;

/// Domain separation context for network keys.
pub const NETWORK_KEY_CONTEXT: &str = "quantum-vault 2024-01-01 network stream key";

/// Derive key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}

/// Network key for `passphrase`. Equal passphrases yield equal keys.
pub fn derive_network_key(passphrase: &str) -> SecretKey {
    SecretKey::from_bytes(blake3_derive_key(NETWORK_KEY_CONTEXT, passphrase.as_bytes()))
}
