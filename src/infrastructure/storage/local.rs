use super::BlobStore;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Blob store backed by a directory tree, one file per key.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            PipelineError::Config(format!(
                "Failed to create blob store directory {}: {}",
                root.display(),
                e
            ))
        })?;

        info!(root = %root.display(), "✅ Local blob store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key onto a path below the root. Keys with `..`, a leading `/` or
    /// empty segments are refused.
    fn key_to_path(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return None;
        }
        if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return None;
        }
        Some(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, local_path: &Path, key: &str) -> PipelineResult<()> {
        let dest = self
            .key_to_path(key)
            .ok_or_else(|| PipelineError::store_write(key, "invalid key"))?;
        let parent = dest
            .parent()
            .ok_or_else(|| PipelineError::store_write(key, "invalid key"))?;

        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::store_write(key, e))?;

        // Bytes land in a sibling temp file and are renamed onto the key, so a
        // failed copy never leaves a truncated object behind.
        let staging = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(parent)
            .map_err(|e| PipelineError::store_write(key, e))?;

        let size = fs::copy(local_path, staging.path()).await.map_err(|e| {
            PipelineError::store_write(
                key,
                format!("cannot copy {}: {}", local_path.display(), e),
            )
        })?;

        staging
            .persist(&dest)
            .map_err(|e| PipelineError::store_write(key, e.error))?;

        debug!(key, size_bytes = size, "⬆️ Stored object");
        Ok(())
    }

    async fn get(&self, key: &str, local_path: &Path) -> PipelineResult<()> {
        let src = self
            .key_to_path(key)
            .ok_or_else(|| PipelineError::store_read(key, "invalid key"))?;

        if !fs::try_exists(&src).await.unwrap_or(false) {
            return Err(PipelineError::store_read(key, "object not found"));
        }

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::store_read(key, e))?;
        }

        let size = fs::copy(&src, local_path).await.map_err(|e| {
            PipelineError::store_read(
                key,
                format!("cannot copy to {}: {}", local_path.display(), e),
            )
        })?;

        debug!(key, size_bytes = size, "⬇️ Fetched object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> PipelineResult<bool> {
        let Some(path) = self.key_to_path(key) else {
            return Ok(false);
        };
        fs::try_exists(&path)
            .await
            .map_err(|e| PipelineError::store_read(key, e))
    }
}
