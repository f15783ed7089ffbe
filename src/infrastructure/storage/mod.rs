pub mod local;
pub mod s3;

use crate::error::PipelineResult;
use async_trait::async_trait;
use std::path::Path;

pub use local::LocalBlobStore;
pub use s3::StorageService;

/// Key-addressed object storage shared by both pipeline stages.
///
/// Writes are visible to every later read through any handle on the same
/// store. There is no overwrite protection and no versioning.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy the local file into the store under `key`. Prefixes are created
    /// implicitly. Fails with `StoreWrite`.
    async fn put(&self, local_path: &Path, key: &str) -> PipelineResult<()>;

    /// Copy the object at `key` into `local_path`. A missing object is a
    /// `StoreRead` failure like any other read error.
    async fn get(&self, key: &str, local_path: &Path) -> PipelineResult<()>;

    async fn exists(&self, key: &str) -> PipelineResult<bool>;
}
