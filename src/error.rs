use thiserror::Error;

/// Errors raised by the pipeline stages and their collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Download failed for {reference}: {reason}")]
    Download { reference: String, reason: String },

    #[error("Store read failed for {key}: {reason}")]
    StoreRead { key: String, reason: String },

    #[error("Store write failed for {key}: {reason}")]
    StoreWrite { key: String, reason: String },

    #[error("Encoding to {target} failed: {reason}")]
    Encode { target: String, reason: String },

    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Consuming {topic} failed: {reason}")]
    Consume { topic: String, reason: String },

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn store_read(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreRead {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn store_write(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreWrite {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn publish(topic: impl Into<String>, reason: impl ToString) -> Self {
        Self::Publish {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }

    pub fn consume(topic: impl Into<String>, reason: impl ToString) -> Self {
        Self::Consume {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }
}
