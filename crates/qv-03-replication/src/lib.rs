//! # Replication Subsystem (qv-03)
//!
//! Keeps named blobs replicated across a peer network and fetches them back
//! on a local miss.
//!
//! ## Architecture Role
//!
//! ```text
//! caller ──store──→ [FileServer] ──StoreAnnounce + stream──→ every peer
//! caller ──get────→ [FileServer] ──GetRequest──→ every peer
//!                         ↑                          │
//!                         └──GetResponse + stream ───┤ (holder)
//!                         └──NotFound ───────────────┘ (everyone else)
//! ```
//!
//! ## Encryption Boundary
//!
//! Blobs are plaintext at rest and encrypted on the wire with one network-wide
//! key. Every announced size is the ciphertext size: plaintext length plus
//! [`ENCRYPTION_OVERHEAD`](shared_crypto::ENCRYPTION_OVERHEAD).
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Envelope, peer registry, pending retrievals, config, errors
//! - `ports/` - The `ReplicationApi`
//! - `service/` - `FileServer`: orchestrators and the dispatch loop
//!
//! ## Usage
//!
//! ```ignore
//! let registry = Arc::new(PeerRegistry::new());
//! let transport = Arc::new(TcpTransport::new(TcpTransportConfig::new(":3000"), registry.clone()));
//! let server = Arc::new(FileServer::new(config, transport, registry));
//! let dispatch = server.start().await?;
//!
//! server.store("photo.jpg", &mut file).await?;
//! let (size, reader) = server.get("photo.jpg").await?;
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    Envelope, PeerRegistry, PendingRetrievals, ReplicationError, ReplicationReport, ServerConfig,
    DEFAULT_IO_TIMEOUT, DEFAULT_RETRIEVAL_TIMEOUT, MAX_KEY_LEN,
};
pub use ports::ReplicationApi;
pub use service::FileServer;
