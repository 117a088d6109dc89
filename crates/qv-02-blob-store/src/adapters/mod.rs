//! # Adapters Layer
//!
//! - `disk` - Production store on the local filesystem
//! - `memory` - In-memory store for tests

mod disk;
mod memory;

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;
