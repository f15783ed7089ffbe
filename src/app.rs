use crate::common::scratch::ScratchSpace;
use crate::config::{AppConfig, BlobStoreConfig};
use crate::infrastructure::media::{FfmpegEncoder, YtDlpDownloader};
use crate::infrastructure::queue::RabbitMqService;
use crate::infrastructure::storage::{BlobStore, LocalBlobStore, StorageService};
use crate::state::PipelineContext;
use crate::workers::{AcquisitionReport, AcquisitionWorker, RetryPolicy, TranscodingWorker};
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn create_store(config: &AppConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match &config.blob_store {
        BlobStoreConfig::Local { root } => Arc::new(LocalBlobStore::new(root.clone()).await?),
        BlobStoreConfig::S3 {
            endpoint,
            region,
            bucket,
            access_key,
            secret_key,
        } => Arc::new(StorageService::new(
            endpoint, region, bucket, access_key, secret_key,
        )),
    };
    Ok(store)
}

pub async fn create_context(config: &AppConfig) -> Result<PipelineContext> {
    let store = create_store(config).await?;
    let mut bus = RabbitMqService::new(&config.rabbitmq_url, &config.consumer_group)
        .await
        .context("Failed to initialize event bus")?;
    if let Some(topic) = &config.dead_letter_topic {
        bus = bus.with_parking_topic(topic.clone());
    }

    Ok(PipelineContext::new(store, Arc::new(bus), ScratchSpace::new(&config.scratch_dir))
        .with_topic(config.topic.clone()))
}

pub async fn run_acquisition(config: &AppConfig) -> Result<AcquisitionReport> {
    let ctx = create_context(config).await?;
    let downloader = YtDlpDownloader::new(
        &config.downloader_bin,
        &config.download_url_template,
        &config.download_extension,
    );

    let worker = AcquisitionWorker::new(ctx, Arc::new(downloader), config.work_list.clone());
    Ok(worker.run().await)
}

pub async fn run_service(config: &AppConfig) -> Result<()> {
    let ctx = create_context(config).await?;
    let worker = TranscodingWorker::new(
        ctx,
        Arc::new(FfmpegEncoder::new(&config.ffmpeg_bin)),
        config.targets.clone(),
    )
    .with_group(config.consumer_group.clone())
    .with_retry_policy(RetryPolicy {
        max_retries: config.max_retries,
        backoff: config.retry_backoff,
    })
    .with_dead_letter_topic(config.dead_letter_topic.clone())
    .with_skip_existing(config.skip_existing);

    worker.run().await.context("Transcoding consumer stopped")
}
