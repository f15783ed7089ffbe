use crate::common::scratch::{ScratchDir, remove_scratch_file};
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::media::Downloader;
use crate::modules::video::{BlobKey, PipelineEvent, SourceReference, download_base_name};
use crate::state::PipelineContext;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one pass over the work list.
#[derive(Debug, Default)]
pub struct AcquisitionReport {
    pub published: Vec<BlobKey>,
    pub failed: Vec<(SourceReference, PipelineError)>,
}

/// Batch job: download, store and announce each work list item in turn.
pub struct AcquisitionWorker {
    ctx: PipelineContext,
    downloader: Arc<dyn Downloader>,
    work_list: Vec<SourceReference>,
}

impl AcquisitionWorker {
    pub fn new(
        ctx: PipelineContext,
        downloader: Arc<dyn Downloader>,
        work_list: Vec<SourceReference>,
    ) -> Self {
        Self {
            ctx,
            downloader,
            work_list,
        }
    }

    /// Processes every item sequentially. A failing item is logged and
    /// skipped; it is never retried.
    pub async fn run(&self) -> AcquisitionReport {
        info!(
            items = self.work_list.len(),
            topic = %self.ctx.topic,
            "📥 Starting acquisition batch"
        );

        let mut report = AcquisitionReport::default();
        for reference in &self.work_list {
            match self.acquire(reference).await {
                Ok(key) => {
                    info!(%reference, %key, "✅ Acquired and published");
                    report.published.push(key);
                }
                Err(e) => {
                    error!(%reference, error = %e, "❌ Acquisition failed, skipping");
                    report.failed.push((reference.clone(), e));
                }
            }
        }

        info!(
            published = report.published.len(),
            failed = report.failed.len(),
            "Acquisition batch finished"
        );
        report
    }

    /// Acquires one reference. Its scratch directory is gone when this returns.
    pub async fn acquire(&self, reference: &SourceReference) -> PipelineResult<BlobKey> {
        let dir = self.ctx.scratch.create_dir("acquire").await?;
        let result = self.acquire_into(&dir, reference).await;
        dir.remove().await;
        result
    }

    async fn acquire_into(
        &self,
        dir: &ScratchDir,
        reference: &SourceReference,
    ) -> PipelineResult<BlobKey> {
        let base_path = dir.join(download_base_name(reference));
        let local = self.downloader.download(reference, &base_path).await?;

        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::Download {
                reference: reference.to_string(),
                reason: format!("unusable output path {}", local.display()),
            })?;
        let key = self.ctx.layout.original_key(file_name);

        self.ctx.store.put(&local, key.as_str()).await?;

        let event = PipelineEvent::new(key.clone());
        self.ctx.bus.publish(&self.ctx.topic, &event.to_payload()).await?;

        remove_scratch_file(&local).await;
        Ok(key)
    }
}
