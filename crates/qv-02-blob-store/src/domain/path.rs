//! Key to path derivation.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use sha2::{Digest, Sha256};

use super::errors::BlobStoreError;

/// Length of each directory segment in a content-addressed path.
pub const CAS_SEGMENT_LEN: usize = 8;

/// Where a blob lives, relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey {
    /// Directory chain below the root (empty for flat layouts).
    pub dir: PathBuf,
    /// File name inside `dir`.
    pub file_name: String,
}

impl PathKey {
    /// `dir/file_name`, relative to the storage root.
    pub fn relative_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// First directory below the root, if any.
    pub fn first_segment(&self) -> Option<&Path> {
        self.dir.components().next().map(|c| Path::new(c.as_os_str()))
    }
}

/// Content-addressed layout: SHA-256 of the key in hex, split into
/// [`CAS_SEGMENT_LEN`]-character directories, with the full digest as the
/// file name.
///
/// ```text
/// "picture.png" -> 6b86b273/ff34fce1/.../6b86b273ff34fce1...
/// ```
pub fn cas_path_transform(key: &str) -> PathKey {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));

    let dir = digest
        .as_bytes()
        .chunks(CAS_SEGMENT_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<PathBuf>();

    PathKey {
        dir,
        file_name: digest,
    }
}

/// Flat layout: the key is the file name.
pub fn plain_path_transform(key: &str) -> PathKey {
    PathKey {
        dir: PathBuf::new(),
        file_name: key.to_string(),
    }
}

/// How keys are mapped onto the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathLayout {
    /// [`cas_path_transform`]
    #[default]
    ContentAddressed,
    /// [`plain_path_transform`]
    Plain,
}

impl PathLayout {
    /// Derive the path for `key`.
    pub fn path_for(&self, key: &str) -> PathKey {
        match self {
            Self::ContentAddressed => cas_path_transform(key),
            Self::Plain => plain_path_transform(key),
        }
    }
}

impl fmt::Display for PathLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentAddressed => write!(f, "cas"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for PathLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cas" | "content-addressed" => Ok(Self::ContentAddressed),
            "plain" | "flat" => Ok(Self::Plain),
            other => Err(format!("unknown path layout '{other}' (expected 'cas' or 'plain')")),
        }
    }
}

/// Check that `key` maps to a single file strictly below the storage root.
///
/// Content-addressed paths are always safe; the check matters for
/// [`PathLayout::Plain`], where the key is used verbatim.
pub fn validate_key(layout: PathLayout, key: &str) -> Result<PathKey, BlobStoreError> {
    if key.is_empty() {
        return Err(BlobStoreError::InvalidKey("empty key".to_string()));
    }

    let path_key = layout.path_for(key);
    let relative = path_key.relative_path();
    let mut components = relative.components();
    let all_normal = components.all(|c| matches!(c, Component::Normal(_)));
    if !all_normal || path_key.file_name.contains(['/', '\\']) {
        return Err(BlobStoreError::InvalidKey(format!(
            "'{key}' does not map to a file below the storage root"
        )));
    }

    Ok(path_key)
}
