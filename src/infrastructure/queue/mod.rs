pub mod memory;
pub mod rabbitmq;

use crate::error::PipelineResult;
use async_trait::async_trait;

pub use memory::MemoryBus;
pub use rabbitmq::RabbitMqService;

/// Callback invoked once per delivered message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> PipelineResult<()>;
}

/// Topic based log with consumer groups and at-least-once delivery.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Append `message` to `topic`. A retried publish may leave duplicates in
    /// the log; consumers must treat each copy as its own trigger.
    async fn publish(&self, topic: &str, message: &str) -> PipelineResult<()>;

    /// Consume `topic` as a member of `group`.
    ///
    /// Each message is handed to `handler` and awaited before the next one is
    /// delivered. A message is acknowledged only when the handler returns
    /// `Ok`. A handler error is not caught: the message stays unacknowledged
    /// and the error is returned, ending the subscription. Returns `Ok(())`
    /// once the log is closed.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: &dyn MessageHandler,
    ) -> PipelineResult<()>;
}
