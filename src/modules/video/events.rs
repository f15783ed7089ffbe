use super::model::BlobKey;
use crate::error::{PipelineError, PipelineResult};

/// Message announcing a freshly acquired original. The payload on the wire is
/// the bare UTF-8 key, without any envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEvent {
    pub key: BlobKey,
}

impl PipelineEvent {
    pub fn new(key: BlobKey) -> Self {
        Self { key }
    }

    pub fn to_payload(&self) -> String {
        self.key.as_str().to_string()
    }

    pub fn from_payload(payload: &[u8]) -> PipelineResult<Self> {
        let key = std::str::from_utf8(payload)
            .map_err(|e| PipelineError::InvalidPayload(format!("not UTF-8: {}", e)))?;
        if key.trim().is_empty() {
            return Err(PipelineError::InvalidPayload("empty key".to_string()));
        }
        Ok(Self::new(BlobKey::new(key)))
    }
}
