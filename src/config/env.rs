use crate::error::{PipelineError, PipelineResult};
use std::env;
use std::str::FromStr;

#[derive(Clone, Copy, Debug)]
pub enum EnvKey {
    ScratchDir,
    BlobStoreBackend,
    BlobStoreLocalRoot,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    S3Region,
    RabbitMqUrl,
    EventTopic,
    ConsumerGroup,
    DeadLetterTopic,
    TranscodeTargets,
    TranscodeSkipExisting,
    HandlerMaxRetries,
    HandlerRetryBackoffMs,
    WorkList,
    DownloaderBin,
    DownloadUrlTemplate,
    DownloadExtension,
    FfmpegBin,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ScratchDir => "SCRATCH_DIR",
            EnvKey::BlobStoreBackend => "BLOB_STORE_BACKEND",
            EnvKey::BlobStoreLocalRoot => "BLOB_STORE_LOCAL_ROOT",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_VIDEOS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::RabbitMqUrl => "RABBITMQ_URL",
            EnvKey::EventTopic => "EVENT_TOPIC",
            EnvKey::ConsumerGroup => "CONSUMER_GROUP",
            EnvKey::DeadLetterTopic => "DEAD_LETTER_TOPIC",
            EnvKey::TranscodeTargets => "TRANSCODE_TARGETS",
            EnvKey::TranscodeSkipExisting => "TRANSCODE_SKIP_EXISTING",
            EnvKey::HandlerMaxRetries => "HANDLER_MAX_RETRIES",
            EnvKey::HandlerRetryBackoffMs => "HANDLER_RETRY_BACKOFF_MS",
            EnvKey::WorkList => "WORK_LIST",
            EnvKey::DownloaderBin => "DOWNLOADER_BIN",
            EnvKey::DownloadUrlTemplate => "DOWNLOAD_URL_TEMPLATE",
            EnvKey::DownloadExtension => "DOWNLOAD_EXTENSION",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
        }
    }
}

/// Where configuration values come from. The process environment in
/// production, a map in tests.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

pub fn get(lookup: Lookup<'_>, key: EnvKey) -> Option<String> {
    lookup(key.as_str())
}

pub fn get_or(lookup: Lookup<'_>, key: EnvKey, default: &str) -> String {
    get(lookup, key).unwrap_or_else(|| default.to_string())
}

pub fn require(lookup: Lookup<'_>, key: EnvKey) -> PipelineResult<String> {
    get(lookup, key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PipelineError::Config(format!("{} is not set", key.as_str())))
}

pub fn get_parsed<T: FromStr>(lookup: Lookup<'_>, key: EnvKey, default: T) -> PipelineResult<T> {
    match get(lookup, key) {
        Some(val) => val.trim().parse::<T>().map_err(|_| {
            PipelineError::Config(format!("{} has an invalid value '{}'", key.as_str(), val))
        }),
        None => Ok(default),
    }
}

pub fn get_flag(lookup: Lookup<'_>, key: EnvKey, default: bool) -> PipelineResult<bool> {
    match get(lookup, key) {
        Some(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PipelineError::Config(format!(
                "{} has an invalid value '{}'",
                key.as_str(),
                val
            ))),
        },
        None => Ok(default),
    }
}
