//! # Domain Layer
//!
//! - `path` - Key to on-disk path derivation
//! - `errors` - Blob store errors

mod errors;
mod path;

pub use errors::BlobStoreError;
pub use path::{
    cas_path_transform, plain_path_transform, validate_key, PathKey, PathLayout, CAS_SEGMENT_LEN,
};
