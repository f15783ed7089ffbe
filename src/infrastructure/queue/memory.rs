use super::{EventBus, MessageHandler};
use crate::error::PipelineResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, watch};
use tracing::debug;

#[derive(Default)]
struct Log {
    topics: HashMap<String, Vec<Vec<u8>>>,
    // committed offset per (topic, group)
    offsets: HashMap<(String, String), usize>,
    closed: bool,
}

enum Next {
    Message(usize, Vec<u8>),
    Wait,
    Closed,
}

/// In-process event log with per-group committed offsets.
pub struct MemoryBus {
    log: Mutex<Log>,
    appended: watch::Sender<u64>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            log: Mutex::new(Log::default()),
            appended,
        }
    }

    /// Marks the log as finished. Subscribers stop waiting and return once
    /// they have drained it. Appends are still accepted, so handlers can keep
    /// publishing while the log drains.
    pub async fn close(&self) {
        self.log.lock().await.closed = true;
        self.appended.send_modify(|v| *v += 1);
    }

    /// Every message ever appended to `topic`, in order.
    pub async fn messages(&self, topic: &str) -> Vec<String> {
        self.log
            .lock()
            .await
            .topics
            .get(topic)
            .map(|msgs| {
                msgs.iter()
                    .map(|m| String::from_utf8_lossy(m).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Offset `group` has committed on `topic`.
    pub async fn committed(&self, topic: &str, group: &str) -> usize {
        self.log
            .lock()
            .await
            .offsets
            .get(&(topic.to_string(), group.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Appends raw bytes, bypassing the UTF-8 message API.
    pub async fn publish_raw(&self, topic: &str, payload: &[u8]) -> PipelineResult<()> {
        self.log
            .lock()
            .await
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(payload.to_vec());
        self.appended.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn next_for(&self, topic: &str, group: &str) -> Next {
        let log = self.log.lock().await;
        let offset = log
            .offsets
            .get(&(topic.to_string(), group.to_string()))
            .copied()
            .unwrap_or(0);
        match log.topics.get(topic).and_then(|msgs| msgs.get(offset)) {
            Some(msg) => Next::Message(offset, msg.clone()),
            None if log.closed => Next::Closed,
            None => Next::Wait,
        }
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, topic: &str, message: &str) -> PipelineResult<()> {
        self.publish_raw(topic, message.as_bytes()).await
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: &dyn MessageHandler,
    ) -> PipelineResult<()> {
        let mut appended = self.appended.subscribe();
        loop {
            match self.next_for(topic, group).await {
                Next::Message(offset, payload) => {
                    handler.handle(&payload).await?;
                    self.log
                        .lock()
                        .await
                        .offsets
                        .insert((topic.to_string(), group.to_string()), offset + 1);
                    debug!(topic, group, offset, "Committed offset");
                }
                Next::Closed => return Ok(()),
                Next::Wait => {
                    if appended.changed().await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
