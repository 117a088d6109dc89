//! # Blob Store Subsystem (qv-02)
//!
//! Local persistence for named byte blobs. Keys are opaque strings; where a
//! blob lands on disk is decided by a [`PathLayout`].
//!
//! ## Storage Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Plaintext at rest | Replicated writes are decrypted before they touch disk |
//! | Atomic writes | Content is written to a temp file and renamed into place |
//! | Overwrite by key | Writing an existing key replaces the previous blob |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Path derivation, key validation, errors
//! - `ports/` - The `BlobStore` API
//! - `adapters/` - `DiskBlobStore` (production) and `MemoryBlobStore` (tests)
//!
//! ## Usage
//!
//! ```ignore
//! use qv_02_blob_store::{BlobStore, DiskBlobStore, PathLayout};
//!
//! let store = DiskBlobStore::new("/var/lib/qv", PathLayout::ContentAddressed);
//! let written = store.write("photo.jpg", &mut file).await?;
//! let (size, mut reader) = store.read("photo.jpg").await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{DiskBlobStore, MemoryBlobStore};
pub use domain::{
    cas_path_transform, plain_path_transform, validate_key, BlobStoreError, PathKey, PathLayout,
    CAS_SEGMENT_LEN,
};
pub use ports::{BlobReader, BlobStore};
