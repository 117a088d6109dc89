//! Filesystem-backed blob store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use shared_crypto::{decrypt_copy, SecretKey};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::domain::{validate_key, BlobStoreError, PathKey, PathLayout};
use crate::ports::{BlobReader, BlobStore};

/// Blob store rooted at a directory on the local filesystem.
///
/// Writes go to a temp file next to the destination and are renamed into
/// place once complete, so readers never observe a partially written blob and
/// a failed decrypt leaves the previous blob untouched.
#[derive(Debug)]
pub struct DiskBlobStore {
    root: PathBuf,
    layout: PathLayout,
    temp_counter: AtomicU64,
}

enum Transform<'a> {
    Copy,
    Decrypt(&'a SecretKey),
}

impl DiskBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new<P: AsRef<Path>>(root: P, layout: PathLayout) -> Self {
        let root = root.as_ref().to_path_buf();
        tracing::info!(
            "[qv-02] 📁 Blob store at {} (layout: {})",
            root.display(),
            layout
        );
        Self {
            root,
            layout,
            temp_counter: AtomicU64::new(0),
        }
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path layout in use.
    pub fn layout(&self) -> PathLayout {
        self.layout
    }

    /// Absolute path the blob for `key` is stored at.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        let path_key = validate_key(self.layout, key)?;
        Ok(self.root.join(path_key.relative_path()))
    }

    fn temp_path(&self, dir: &Path, path_key: &PathKey) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        dir.join(format!(
            ".{}.{}.{}.tmp",
            path_key.file_name,
            std::process::id(),
            n
        ))
    }

    async fn write_blob(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        transform: Transform<'_>,
    ) -> Result<u64, BlobStoreError> {
        let path_key = validate_key(self.layout, key)?;
        let dir = self.root.join(&path_key.dir);
        fs::create_dir_all(&dir).await?;

        let final_path = dir.join(&path_key.file_name);
        let temp_path = self.temp_path(&dir, &path_key);

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            let written = match transform {
                Transform::Copy => tokio::io::copy(reader, &mut file).await?,
                Transform::Decrypt(secret) => decrypt_copy(secret, reader, &mut file).await?,
            };
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &final_path).await?;
            Ok::<u64, BlobStoreError>(written)
        }
        .await;

        match result {
            Ok(written) => {
                tracing::debug!(
                    key,
                    bytes = written,
                    path = %final_path.display(),
                    "[qv-02] Blob written"
                );
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    /// Remove empty directories between `dir` and the root.
    async fn prune_empty_dirs(&self, mut dir: PathBuf) {
        while dir != self.root && dir.starts_with(&self.root) {
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(&dir).await.is_err() {
                break;
            }
            if !dir.pop() {
                break;
            }
        }
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn has(&self, key: &str) -> bool {
        match self.path_for(key) {
            Ok(path) => fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read(&self, key: &str) -> Result<(u64, BlobReader), BlobStoreError> {
        let path = self.path_for(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobStoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((size, Box::new(file)))
    }

    async fn write(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError> {
        self.write_blob(key, reader, Transform::Copy).await
    }

    async fn write_decrypted(
        &self,
        secret: &SecretKey,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, BlobStoreError> {
        self.write_blob(key, reader, Transform::Decrypt(secret)).await
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobStoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent.to_path_buf()).await;
        }
        tracing::debug!(key, "[qv-02] Blob deleted");
        Ok(())
    }

    async fn clear(&self) -> Result<(), BlobStoreError> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!("[qv-02] 🧹 Cleared blob store at {}", self.root.display());
        Ok(())
    }
}
