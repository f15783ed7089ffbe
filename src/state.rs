use crate::common::scratch::ScratchSpace;
use crate::config::settings::DEFAULT_TOPIC;
use crate::infrastructure::queue::EventBus;
use crate::infrastructure::storage::BlobStore;
use crate::modules::video::KeyLayout;
use std::sync::Arc;

/// Everything a worker shares with the rest of the pipeline. Each worker gets
/// its own handle, so several pipelines can run side by side in one process.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn BlobStore>,
    pub bus: Arc<dyn EventBus>,
    pub scratch: ScratchSpace,
    pub layout: KeyLayout,
    pub topic: String,
}

impl PipelineContext {
    pub fn new(store: Arc<dyn BlobStore>, bus: Arc<dyn EventBus>, scratch: ScratchSpace) -> Self {
        Self {
            store,
            bus,
            scratch,
            layout: KeyLayout::default(),
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }
}
