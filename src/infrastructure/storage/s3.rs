use super::BlobStore;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// S3-compatible blob store (MinIO in development).
#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
}

impl StorageService {
    pub fn new(
        endpoint: &str,
        region: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!(endpoint, bucket, "✅ S3 blob store configured");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for StorageService {
    async fn put(&self, local_path: &Path, key: &str) -> PipelineResult<()> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            PipelineError::store_write(
                key,
                format!("cannot read {}: {}", local_path.display(), e),
            )
        })?;

        let content_type = mime_guess::from_path(key).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type.essence_str())
            .send()
            .await
            .map_err(|e| PipelineError::store_write(key, DisplayErrorContext(&e)))?;

        debug!(key, bucket = %self.bucket, "⬆️ Uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str, local_path: &Path) -> PipelineResult<()> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => {
                    PipelineError::store_read(key, "object not found")
                }
                _ => PipelineError::store_read(key, DisplayErrorContext(&e)),
            })?;

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::store_read(key, e))?;
        }

        let mut file = fs::File::create(local_path).await.map_err(|e| {
            PipelineError::store_read(
                key,
                format!("cannot create {}: {}", local_path.display(), e),
            )
        })?;

        let mut body = output.body.into_async_read();
        let size = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| PipelineError::store_read(key, e))?;
        file.flush()
            .await
            .map_err(|e| PipelineError::store_read(key, e))?;

        debug!(key, size_bytes = size, "⬇️ Downloaded object");
        Ok(())
    }

    async fn exists(&self, key: &str) -> PipelineResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.as_service_error() {
                Some(se) if se.is_not_found() => Ok(false),
                _ => Err(PipelineError::store_read(key, DisplayErrorContext(&e))),
            },
        }
    }
}
