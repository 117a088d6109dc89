//! # Ports Layer
//!
//! - `inbound.rs` - The replication API offered to the node and its callers

pub mod inbound;

pub use inbound::ReplicationApi;
