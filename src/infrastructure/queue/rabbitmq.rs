use super::{EventBus, MessageHandler};
use crate::error::{PipelineError, PipelineResult};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind, options::*,
    types::FieldTable,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Event bus on RabbitMQ.
///
/// A topic is a durable fanout exchange. A consumer group is a durable queue
/// named `<topic>.<group>` bound to that exchange, so every group receives
/// every message and the members of one group share its queue. Publishing
/// declares and binds the queue of the configured group first, so events sent
/// before any consumer has started are kept. Parking topics (dead letters)
/// get a single queue named after the topic instead.
#[derive(Clone)]
pub struct RabbitMqService {
    url: String,
    conn: Arc<Mutex<Connection>>,
    channel: Arc<Mutex<Channel>>,
    group: String,
    parking_topics: Vec<String>,
}

fn group_queue(topic: &str, group: &str) -> String {
    format!("{}.{}", topic, group)
}

/// Queue a published message must land in for `topic`.
fn publish_queue(topic: &str, group: &str, parking_topics: &[String]) -> String {
    if parking_topics.iter().any(|t| t == topic) {
        topic.to_string()
    } else {
        group_queue(topic, group)
    }
}

impl RabbitMqService {
    async fn connect(url: &str) -> Result<(Connection, Channel)> {
        info!("Connecting to RabbitMQ at {}", url);
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create channel: {}", e))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to enable publisher confirms: {}", e))?;

        info!("✅ Connected to RabbitMQ");
        Ok((conn, channel))
    }

    pub async fn new(url: &str, group: &str) -> Result<Self> {
        let (conn, channel) = Self::connect(url).await?;

        Ok(Self {
            url: url.to_string(),
            conn: Arc::new(Mutex::new(conn)),
            channel: Arc::new(Mutex::new(channel)),
            group: group.to_string(),
            parking_topics: Vec::new(),
        })
    }

    /// Messages published to `topic` are kept in a queue named after it.
    pub fn with_parking_topic(mut self, topic: impl Into<String>) -> Self {
        self.parking_topics.push(topic.into());
        self
    }

    async fn reconnect(&self) -> Result<()> {
        warn!("RabbitMQ connection dropped, reconnecting...");
        let (conn, channel) = Self::connect(&self.url).await?;
        *self.conn.lock().await = conn;
        *self.channel.lock().await = channel;
        Ok(())
    }

    /// Declares the topic exchange and a durable queue bound to it.
    async fn declare_queue(channel: &Channel, topic: &str, queue: &str) -> Result<()> {
        channel
            .exchange_declare(
                topic,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to declare exchange: {}", e))?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to declare queue: {}", e))?;

        channel
            .queue_bind(
                queue,
                topic,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to bind queue: {}", e))
    }

    async fn publish_internal(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let channel = self.channel.lock().await;

        // Ensure queue exists
        let queue = publish_queue(topic, &self.group, &self.parking_topics);
        Self::declare_queue(&channel, topic, &queue).await?;

        let confirmation = channel
            .basic_publish(
                topic,
                "",
                BasicPublishOptions {
                    mandatory: true,
                    ..BasicPublishOptions::default()
                },
                payload,
                BasicProperties::default().with_delivery_mode(2), // Persistent
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message: {}", e))?
            .await
            .map_err(|e| anyhow!("Failed to confirm publication: {}", e))?;

        if confirmation.is_nack() {
            return Err(anyhow!("Broker rejected the message"));
        }
        // Mandatory messages that reach no queue come back before the ack.
        if let Some(returned) = confirmation.take_message() {
            return Err(anyhow!(
                "Message was returned as unroutable: {} {}",
                returned.reply_code,
                returned.reply_text.as_str()
            ));
        }

        Ok(())
    }

    /// Declares the group queue and binds it to the topic exchange.
    async fn prepare_consumer(&self, topic: &str, group: &str) -> Result<(Channel, String)> {
        let channel = self
            .conn
            .lock()
            .await
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create consumer channel: {}", e))?;

        // One unacknowledged delivery at a time.
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set prefetch: {}", e))?;

        let queue_name = group_queue(topic, group);
        Self::declare_queue(&channel, topic, &queue_name).await?;

        Ok((channel, queue_name))
    }
}

#[async_trait]
impl EventBus for RabbitMqService {
    async fn publish(&self, topic: &str, message: &str) -> PipelineResult<()> {
        let payload = message.as_bytes();
        if let Err(e) = self.publish_internal(topic, payload).await {
            warn!("RabbitMQ publish failed: {}. Retrying after reconnect.", e);
            self.reconnect()
                .await
                .map_err(|e| PipelineError::publish(topic, e))?;
            self.publish_internal(topic, payload)
                .await
                .map_err(|e| PipelineError::publish(topic, e))?;
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: &dyn MessageHandler,
    ) -> PipelineResult<()> {
        let (channel, queue_name) = self
            .prepare_consumer(topic, group)
            .await
            .map_err(|e| PipelineError::consume(topic, e))?;

        let consumer_tag = format!("{}-{}", group, Uuid::new_v4().simple());
        let mut consumer = channel
            .basic_consume(
                &queue_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                PipelineError::consume(topic, format!("Failed to create consumer: {}", e))
            })?;

        info!(topic, group, queue = %queue_name, "🎥 Listening for events");

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery.map_err(|e| PipelineError::consume(topic, e))?;

            // Unacknowledged deliveries go back to the queue when the channel closes.
            if let Err(e) = handler.handle(&delivery.data).await {
                error!(topic, group, error = %e, "Handler failed, stopping consumer");
                return Err(e);
            }

            delivery
                .ack(BasicAckOptions::default())
                .await
                .map_err(|e| {
                    PipelineError::consume(topic, format!("Failed to ack message: {}", e))
                })?;
        }

        warn!(topic, group, "Consumer stream closed");
        Ok(())
    }
}
