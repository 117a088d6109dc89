//! # Ports Layer
//!
//! - `inbound.rs` - The `BlobStore` API used by the replication service

pub mod inbound;

pub use inbound::{BlobReader, BlobStore};
