//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Barrier, Mutex};
use video_pipeline::PipelineError;
use video_pipeline::common::scratch::ScratchSpace;
use video_pipeline::error::PipelineResult;
use video_pipeline::infrastructure::media::{Downloader, Encoder, encoded_output_path};
use video_pipeline::infrastructure::queue::{EventBus, MemoryBus, MessageHandler};
use video_pipeline::infrastructure::storage::{BlobStore, LocalBlobStore};
use video_pipeline::modules::video::{SourceReference, TranscodeTarget};
use video_pipeline::state::PipelineContext;

pub const TOPIC: &str = "video-uploads";
pub const DEAD_LETTER: &str = "video-uploads.dead-letter";

/// Downloader double that writes a small file instead of fetching anything.
pub struct FakeDownloader {
    pub fail_on: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self {
            fail_on: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(refs: &[&str]) -> Self {
        Self {
            fail_on: refs.iter().map(|r| r.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        reference: &SourceReference,
        base_path: &Path,
    ) -> PipelineResult<PathBuf> {
        self.calls.lock().await.push(reference.to_string());
        if self.fail_on.contains(reference.as_str()) {
            return Err(PipelineError::Download {
                reference: reference.to_string(),
                reason: "video unavailable".to_string(),
            });
        }
        let path = PathBuf::from(format!("{}.mp4", base_path.display()));
        tokio::fs::write(&path, format!("source:{}", reference)).await?;
        Ok(path)
    }
}

/// Encoder double: output content is `<target>:<input content>`.
pub struct FakeEncoder {
    pub fail_on: Option<String>,
    pub barrier: Option<Arc<Barrier>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self {
            fail_on: None,
            barrier: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(target: &str) -> Self {
        Self {
            fail_on: Some(target.to_string()),
            ..Self::new()
        }
    }

    /// Every conversion blocks until `count` of them are running at once.
    pub fn rendezvous(count: usize) -> Self {
        Self {
            barrier: Some(Arc::new(Barrier::new(count))),
            ..Self::new()
        }
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        input: &Path,
        target: &TranscodeTarget,
        output_dir: &Path,
    ) -> PipelineResult<PathBuf> {
        self.calls.lock().await.push(target.to_string());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let source = tokio::fs::read(input).await?;
        let output = encoded_output_path(input, target, output_dir);

        if self.fail_on.as_deref() == Some(target.extension()) {
            // leave a partial file behind like a crashed encoder would
            tokio::fs::write(&output, b"partial").await?;
            return Err(PipelineError::Encode {
                target: target.to_string(),
                reason: "encoder crashed".to_string(),
            });
        }

        let mut content = format!("{}:", target).into_bytes();
        content.extend_from_slice(&source);
        tokio::fs::write(&output, content).await?;
        Ok(output)
    }
}

/// Local store that counts operations per key and can refuse writes.
pub struct RecordingStore {
    pub inner: LocalBlobStore,
    pub puts: Mutex<HashMap<String, usize>>,
    pub gets: Mutex<Vec<String>>,
    pub fail_puts_under: Option<String>,
    /// Keys whose next put fails once.
    pub flaky_puts: Mutex<HashSet<String>>,
}

impl RecordingStore {
    pub async fn put_count(&self, key: &str) -> usize {
        self.puts.lock().await.get(key).copied().unwrap_or(0)
    }

    pub async fn puts_under(&self, prefix: &str) -> usize {
        self.puts
            .lock()
            .await
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }

    pub async fn read(&self, key: &str) -> Vec<u8> {
        tokio::fs::read(self.inner.root().join(key)).await.unwrap()
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn put(&self, local_path: &Path, key: &str) -> PipelineResult<()> {
        if let Some(prefix) = &self.fail_puts_under {
            if key.starts_with(prefix.as_str()) {
                return Err(PipelineError::store_write(key, "bucket is read-only"));
            }
        }
        if self.flaky_puts.lock().await.remove(key) {
            // the bytes never reach the key; the source is gone mid-copy
            let vanished = local_path.with_extension("vanished");
            return self.inner.put(&vanished, key).await;
        }
        self.inner.put(local_path, key).await?;
        *self.puts.lock().await.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    async fn get(&self, key: &str, local_path: &Path) -> PipelineResult<()> {
        self.gets.lock().await.push(key.to_string());
        self.inner.get(key, local_path).await
    }

    async fn exists(&self, key: &str) -> PipelineResult<bool> {
        self.inner.exists(key).await
    }
}

/// Memory bus that refuses publishes to one topic.
pub struct FailingBus {
    pub inner: Arc<MemoryBus>,
    pub fail_topic: String,
}

#[async_trait]
impl EventBus for FailingBus {
    async fn publish(&self, topic: &str, message: &str) -> PipelineResult<()> {
        if topic == self.fail_topic {
            return Err(PipelineError::publish(topic, "broker unavailable"));
        }
        self.inner.publish(topic, message).await
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: &dyn MessageHandler,
    ) -> PipelineResult<()> {
        self.inner.subscribe(topic, group, handler).await
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<RecordingStore>,
    pub bus: Arc<MemoryBus>,
    pub scratch_root: PathBuf,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_read_only_prefix(prefix: &str) -> Self {
        Self::build(Some(prefix.to_string())).await
    }

    async fn build(fail_puts_under: Option<String>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let scratch_root = dir.path().join("scratch");
        tokio::fs::create_dir_all(&scratch_root).await.unwrap();

        let inner = LocalBlobStore::new(dir.path().join("store")).await.unwrap();
        Self {
            store: Arc::new(RecordingStore {
                inner,
                puts: Mutex::new(HashMap::new()),
                gets: Mutex::new(Vec::new()),
                fail_puts_under,
                flaky_puts: Mutex::new(HashSet::new()),
            }),
            bus: Arc::new(MemoryBus::new()),
            scratch_root,
            dir,
        }
    }

    pub fn context(&self) -> PipelineContext {
        PipelineContext::new(
            self.store.clone(),
            self.bus.clone(),
            ScratchSpace::new(&self.scratch_root),
        )
    }

    pub fn context_with_bus(&self, bus: Arc<dyn EventBus>) -> PipelineContext {
        PipelineContext::new(self.store.clone(), bus, ScratchSpace::new(&self.scratch_root))
    }

    /// Puts `content` into the store under `key` as if it had been acquired.
    pub async fn seed(&self, key: &str, content: &[u8]) {
        let staging = self.dir.path().join("seed.bin");
        tokio::fs::write(&staging, content).await.unwrap();
        self.store.inner.put(&staging, key).await.unwrap();
        tokio::fs::remove_file(&staging).await.unwrap();
    }

    /// The next put of `key` fails.
    pub async fn fail_next_put(&self, key: &str) {
        self.store.flaky_puts.lock().await.insert(key.to_string());
    }

    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch_root).unwrap().next().is_none()
    }
}

pub fn refs(raw: &[&str]) -> Vec<SourceReference> {
    raw.iter().map(|r| SourceReference::parse(r).unwrap()).collect()
}

pub fn targets(raw: &str) -> Vec<TranscodeTarget> {
    TranscodeTarget::parse_list(raw).unwrap()
}
