use crate::common::scratch::{ScratchDir, remove_scratch_file};
use crate::config::settings::DEFAULT_CONSUMER_GROUP;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::media::{Encoder, encoded_output_path};
use crate::infrastructure::queue::MessageHandler;
use crate::modules::video::{BlobKey, PipelineEvent, TranscodeTarget};
use crate::state::PipelineContext;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound for the delay between two handler attempts.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);

/// How often a failed event is reprocessed before it is dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt`, counting from 1. Doubles each
    /// time and is capped at `MAX_RETRY_BACKOFF`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(MAX_RETRY_BACKOFF)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// Keys written to the blob store, in target order.
    Completed(Vec<BlobKey>),
    /// Every expected output already existed.
    Skipped,
}

/// Long-lived consumer that turns each announced original into one encoded
/// object per configured target.
pub struct TranscodingWorker {
    ctx: PipelineContext,
    encoder: Arc<dyn Encoder>,
    targets: Vec<TranscodeTarget>,
    group: String,
    retry: RetryPolicy,
    dead_letter_topic: Option<String>,
    skip_existing: bool,
}

impl TranscodingWorker {
    pub fn new(
        ctx: PipelineContext,
        encoder: Arc<dyn Encoder>,
        targets: Vec<TranscodeTarget>,
    ) -> Self {
        Self {
            ctx,
            encoder,
            targets,
            group: DEFAULT_CONSUMER_GROUP.to_string(),
            retry: RetryPolicy::none(),
            dead_letter_topic: None,
            skip_existing: false,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dead_letter_topic(mut self, topic: Option<String>) -> Self {
        self.dead_letter_topic = topic;
        self
    }

    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// Subscribes and processes events one at a time until the bus closes or
    /// a handler error escapes the retry policy.
    pub async fn run(&self) -> PipelineResult<()> {
        info!(
            topic = %self.ctx.topic,
            group = %self.group,
            targets = ?self.targets.iter().map(|t| t.extension()).collect::<Vec<_>>(),
            "🎥 Starting Transcoder Worker..."
        );
        self.ctx
            .bus
            .subscribe(&self.ctx.topic, &self.group, self)
            .await
    }

    /// Fetches the original, encodes it to every target concurrently and
    /// stores the results. Nothing is uploaded unless every conversion
    /// succeeded, and the job's scratch files are gone when this returns.
    pub async fn process_video(&self, key: &BlobKey) -> PipelineResult<TranscodeOutcome> {
        if self.skip_existing && self.outputs_exist(key).await? {
            info!(%key, "⏭️ All outputs already stored, skipping");
            return Ok(TranscodeOutcome::Skipped);
        }

        let job = self.ctx.scratch.create_dir("transcode").await?;
        let result = self.process_in(&job, key).await;
        job.remove().await;
        result
    }

    async fn outputs_exist(&self, key: &BlobKey) -> PipelineResult<bool> {
        for encoded in self.ctx.layout.encoded_keys(key, &self.targets) {
            if !self.ctx.store.exists(encoded.as_str()).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn process_in(
        &self,
        job: &ScratchDir,
        key: &BlobKey,
    ) -> PipelineResult<TranscodeOutcome> {
        // 1. Download the original
        let original = job.join("source").join(key.file_name());
        info!(%key, "⬇️ Fetching original");
        self.ctx.store.get(key.as_str(), &original).await?;

        // 2. Encode every target
        let outputs = self.encode_all(&original, job.path()).await?;

        // 3. Upload results
        let mut stored = Vec::with_capacity(outputs.len());
        for (target, path) in self.targets.iter().zip(outputs) {
            let encoded = self.ctx.layout.encoded_key(key.stem(), target);
            self.ctx.store.put(&path, encoded.as_str()).await?;
            remove_scratch_file(&path).await;
            info!(%key, %encoded, "⬆️ Stored encoded output");
            stored.push(encoded);
        }

        // 4. Cleanup
        remove_scratch_file(&original).await;

        Ok(TranscodeOutcome::Completed(stored))
    }

    /// Runs one conversion per target and waits for all of them. If any
    /// failed, every local output is deleted and the first failure in target
    /// order is returned.
    async fn encode_all(&self, original: &Path, output_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        let conversions = self
            .targets
            .iter()
            .map(|target| self.encoder.encode(original, target, output_dir));
        let results = join_all(conversions).await;

        let mut produced = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (target, result) in self.targets.iter().zip(results) {
            match result {
                Ok(path) => produced.push(path),
                Err(e) => {
                    warn!(%target, error = %e, "Conversion failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            for path in &produced {
                remove_scratch_file(path).await;
            }
            // Failed conversions may have left partial files behind.
            for target in &self.targets {
                remove_scratch_file(&encoded_output_path(original, target, output_dir)).await;
            }
            return Err(e);
        }

        Ok(produced)
    }

    /// Hands the key to the dead-letter topic. Without one, or when that
    /// publish fails, the original error is returned to the bus.
    async fn dead_letter(&self, payload: &str, cause: PipelineError) -> PipelineResult<()> {
        let Some(topic) = &self.dead_letter_topic else {
            return Err(cause);
        };

        match self.ctx.bus.publish(topic, payload).await {
            Ok(()) => {
                warn!(
                    dead_letter_topic = %topic,
                    payload,
                    error = %cause,
                    "☠️ Event dead-lettered"
                );
                Ok(())
            }
            Err(e) => {
                error!(dead_letter_topic = %topic, error = %e, "Failed to dead-letter event");
                Err(cause)
            }
        }
    }
}

#[async_trait]
impl MessageHandler for TranscodingWorker {
    async fn handle(&self, payload: &[u8]) -> PipelineResult<()> {
        let event = match PipelineEvent::from_payload(payload) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "❌ Failed to parse event");
                return self
                    .dead_letter(&String::from_utf8_lossy(payload), e)
                    .await;
            }
        };

        info!(key = %event.key, "📦 Received transcoding job");

        let mut attempt = 0;
        loop {
            match self.process_video(&event.key).await {
                Ok(TranscodeOutcome::Completed(stored)) => {
                    info!(
                        key = %event.key,
                        outputs = stored.len(),
                        "✅ Job completed successfully"
                    );
                    return Ok(());
                }
                Ok(TranscodeOutcome::Skipped) => return Ok(()),
                Err(e) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        key = %event.key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transcoding failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        key = %event.key,
                        attempts = attempt + 1,
                        error = %e,
                        "❌ Failed to process job"
                    );
                    return self.dead_letter(event.key.as_str(), e).await;
                }
            }
        }
    }
}
