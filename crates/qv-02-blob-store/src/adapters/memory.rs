//! In-memory blob store for unit tests.

use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::{decrypt_copy, SecretKey};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::{validate_key, BlobStoreError, PathLayout};
use crate::ports::{BlobReader, BlobStore};

/// Blob store keeping everything in a `HashMap`.
///
/// Keys are validated against the content-addressed layout, so any non-empty
/// key is accepted.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Copy of the blob stored under `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn has(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }

    async fn read(&self, key: &str) -> Result<(u64, BlobReader), BlobStoreError> {
        let content = self
            .get(key)
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))?;
        Ok((content.len() as u64, Box::new(Cursor::new(content))))
    }

    async fn write(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError> {
        validate_key(PathLayout::ContentAddressed, key)?;
        let mut content = Vec::new();
        let written = reader.read_to_end(&mut content).await? as u64;
        self.blobs.write().insert(key.to_string(), content);
        Ok(written)
    }

    async fn write_decrypted(
        &self,
        secret: &SecretKey,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError> {
        validate_key(PathLayout::ContentAddressed, key)?;
        let mut content = Vec::new();
        let written = decrypt_copy(secret, reader, &mut content).await?;
        self.blobs.write().insert(key.to_string(), content);
        Ok(written)
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        self.blobs
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    async fn clear(&self) -> Result<(), BlobStoreError> {
        self.blobs.write().clear();
        Ok(())
    }
}
