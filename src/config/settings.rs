use crate::config::env::{self, EnvKey, Lookup};
use crate::error::{PipelineError, PipelineResult};
use crate::modules::video::{SourceReference, TranscodeTarget};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "video-uploads";
pub const DEFAULT_CONSUMER_GROUP: &str = "videoProcessor";
pub const DEFAULT_DEAD_LETTER_TOPIC: &str = "video-uploads.dead-letter";
pub const DEFAULT_TARGETS: &str = "mp4,avi,webm,mkv";

/// Catalog ids acquired when `WORK_LIST` is not set.
pub const DEFAULT_WORK_LIST: &[&str] = &["jNQXAC9IVRw", "aqz-KE-bpKQ"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobStoreConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        endpoint: String,
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub scratch_dir: PathBuf,
    pub blob_store: BlobStoreConfig,
    pub rabbitmq_url: String,
    pub topic: String,
    pub consumer_group: String,
    pub dead_letter_topic: Option<String>,
    pub targets: Vec<TranscodeTarget>,
    pub skip_existing: bool,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub work_list: Vec<SourceReference>,
    pub downloader_bin: String,
    pub download_url_template: String,
    pub download_extension: String,
    pub ffmpeg_bin: String,
}

impl AppConfig {
    pub fn new() -> PipelineResult<Self> {
        Self::from_lookup(&env::process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> PipelineResult<Self> {
        let default_scratch = std::env::temp_dir().join("video-pipeline");

        let blob_store = match env::get_or(lookup, EnvKey::BlobStoreBackend, "s3")
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => BlobStoreConfig::Local {
                root: PathBuf::from(env::get_or(
                    lookup,
                    EnvKey::BlobStoreLocalRoot,
                    "./blob-store",
                )),
            },
            "s3" => BlobStoreConfig::S3 {
                endpoint: env::require(lookup, EnvKey::MinioUrl)?,
                region: env::get_or(lookup, EnvKey::S3Region, "us-east-1"),
                bucket: env::require(lookup, EnvKey::MinioBucket)?,
                access_key: env::require(lookup, EnvKey::MinioAccessKey)?,
                secret_key: env::require(lookup, EnvKey::MinioSecretKey)?,
            },
            other => {
                return Err(PipelineError::Config(format!(
                    "unknown blob store backend '{}'",
                    other
                )));
            }
        };

        let dead_letter_topic =
            env::get_or(lookup, EnvKey::DeadLetterTopic, DEFAULT_DEAD_LETTER_TOPIC);
        let dead_letter_topic =
            Some(dead_letter_topic.trim().to_string()).filter(|t| !t.is_empty());

        let work_list = match env::get(lookup, EnvKey::WorkList) {
            Some(raw) => raw
                .split(',')
                .filter(|r| !r.trim().is_empty())
                .map(SourceReference::parse)
                .collect::<PipelineResult<Vec<_>>>()?,
            None => DEFAULT_WORK_LIST
                .iter()
                .map(|r| SourceReference::parse(r))
                .collect::<PipelineResult<Vec<_>>>()?,
        };

        let download_extension = env::get_or(lookup, EnvKey::DownloadExtension, "mp4");
        TranscodeTarget::parse(&download_extension)?;

        Ok(Self {
            scratch_dir: env::get(lookup, EnvKey::ScratchDir)
                .map(PathBuf::from)
                .unwrap_or(default_scratch),
            blob_store,
            rabbitmq_url: env::get_or(lookup, EnvKey::RabbitMqUrl, "amqp://127.0.0.1:5672/%2f"),
            topic: env::get_or(lookup, EnvKey::EventTopic, DEFAULT_TOPIC),
            consumer_group: env::get_or(lookup, EnvKey::ConsumerGroup, DEFAULT_CONSUMER_GROUP),
            dead_letter_topic,
            targets: TranscodeTarget::parse_list(&env::get_or(
                lookup,
                EnvKey::TranscodeTargets,
                DEFAULT_TARGETS,
            ))?,
            skip_existing: env::get_flag(lookup, EnvKey::TranscodeSkipExisting, true)?,
            max_retries: env::get_parsed(lookup, EnvKey::HandlerMaxRetries, 3)?,
            retry_backoff: Duration::from_millis(env::get_parsed(
                lookup,
                EnvKey::HandlerRetryBackoffMs,
                1000,
            )?),
            work_list,
            downloader_bin: env::get_or(lookup, EnvKey::DownloaderBin, "yt-dlp"),
            download_url_template: env::get_or(
                lookup,
                EnvKey::DownloadUrlTemplate,
                "https://www.youtube.com/watch?v={id}",
            ),
            download_extension,
            ffmpeg_bin: env::get_or(lookup, EnvKey::FfmpegBin, "ffmpeg"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PipelineResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(&move |key: &str| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_local_backend() {
        let config = config_from(&[("BLOB_STORE_BACKEND", "local")]).unwrap();

        assert_eq!(
            config.blob_store,
            BlobStoreConfig::Local {
                root: PathBuf::from("./blob-store")
            }
        );
        assert_eq!(config.topic, "video-uploads");
        assert_eq!(config.consumer_group, "videoProcessor");
        assert_eq!(config.dead_letter_topic.as_deref(), Some("video-uploads.dead-letter"));
        let exts: Vec<&str> = config.targets.iter().map(|t| t.extension()).collect();
        assert_eq!(exts, vec!["mp4", "avi", "webm", "mkv"]);
        assert!(config.skip_existing);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff, Duration::from_millis(1000));
        assert_eq!(config.work_list.len(), DEFAULT_WORK_LIST.len());
    }

    #[test]
    fn s3_backend_requires_connection_settings() {
        let err = config_from(&[("MINIO_ENDPOINT", "http://localhost:9000")]).unwrap_err();
        assert!(err.to_string().contains("MINIO_BUCKET_VIDEOS"));

        let config = config_from(&[
            ("MINIO_ENDPOINT", "http://localhost:9000"),
            ("MINIO_BUCKET_VIDEOS", "videos"),
            ("AWS_ACCESS_KEY_ID", "minio"),
            ("AWS_SECRET_ACCESS_KEY", "minio123"),
        ])
        .unwrap();
        assert!(matches!(
            config.blob_store,
            BlobStoreConfig::S3 { ref bucket, .. } if bucket == "videos"
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("BLOB_STORE_BACKEND", "local"),
            ("WORK_LIST", "v1, v2,,v3"),
            ("TRANSCODE_TARGETS", "webm,mp4"),
            ("DEAD_LETTER_TOPIC", ""),
            ("TRANSCODE_SKIP_EXISTING", "false"),
            ("HANDLER_MAX_RETRIES", "0"),
            ("HANDLER_RETRY_BACKOFF_MS", "25"),
        ])
        .unwrap();

        let refs: Vec<&str> = config.work_list.iter().map(|r| r.as_str()).collect();
        assert_eq!(refs, vec!["v1", "v2", "v3"]);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.dead_letter_topic, None);
        assert!(!config.skip_existing);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_backoff, Duration::from_millis(25));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for pairs in [
            vec![("BLOB_STORE_BACKEND", "ftp")],
            vec![("BLOB_STORE_BACKEND", "local"), ("HANDLER_MAX_RETRIES", "many")],
            vec![("BLOB_STORE_BACKEND", "local"), ("TRANSCODE_SKIP_EXISTING", "maybe")],
            vec![("BLOB_STORE_BACKEND", "local"), ("WORK_LIST", "ok,../etc")],
            vec![("BLOB_STORE_BACKEND", "local"), ("TRANSCODE_TARGETS", "mp4,m p4")],
        ] {
            assert!(matches!(config_from(&pairs), Err(PipelineError::Config(_))), "{:?}", pairs);
        }
    }
}
