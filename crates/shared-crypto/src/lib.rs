//! # Shared Crypto - Stream Encryption and Key Derivation
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20 keys and nonces | Key material |
//! | `stream` | XChaCha20 keystream copy | Encrypt-on-write, decrypt-on-read |
//! | `hashing` | BLAKE3 | Network key derivation from a passphrase |
//!
//! ## Wire Layout
//!
//! Every encrypted stream is `nonce (24 bytes) || ciphertext`. The ciphertext
//! is exactly as long as the plaintext, so an encrypted stream is always
//! [`ENCRYPTION_OVERHEAD`] bytes longer than its source.
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, random per stream, constant-time ARX design
//! - **No authentication tag**: integrity is out of scope for the replication
//!   protocol; a corrupted stream decrypts to garbage of the same length

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod stream;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_derive_key, derive_network_key, NETWORK_KEY_CONTEXT};
pub use stream::{decrypt_copy, encrypt_copy, ENCRYPTION_OVERHEAD};
pub use symmetric::{Nonce, SecretKey, KEY_LEN, NONCE_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
