use super::{Downloader, describe_failure};
use crate::error::{PipelineError, PipelineResult};
use crate::modules::video::SourceReference;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Downloads media by running `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: String,
    url_template: String,
    extension: String,
}

impl YtDlpDownloader {
    pub fn new(program: &str, url_template: &str, extension: &str) -> Self {
        Self {
            program: program.to_string(),
            url_template: url_template.to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn source_url(&self, reference: &SourceReference) -> String {
        self.url_template.replace("{id}", reference.as_str())
    }

    fn failure(reference: &SourceReference, reason: impl Into<String>) -> PipelineError {
        PipelineError::Download {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        reference: &SourceReference,
        base_path: &Path,
    ) -> PipelineResult<PathBuf> {
        let url = self.source_url(reference);
        let template = format!("{}.%(ext)s", base_path.display());
        let expected = PathBuf::from(format!("{}.{}", base_path.display(), self.extension));

        info!(%reference, %url, "⬇️ Downloading source media");

        let output = Command::new(&self.program)
            .args([
                "--no-progress",
                "--no-playlist",
                "--remux-video",
                self.extension.as_str(),
                "-o",
                template.as_str(),
                url.as_str(),
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::failure(reference, format!("cannot run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Self::failure(reference, describe_failure(&self.program, &output)));
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(Self::failure(
                reference,
                format!("expected output {} was not produced", expected.display()),
            ));
        }

        debug!(%reference, path = %expected.display(), "Download finished");
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template_substitutes_reference() {
        let downloader = YtDlpDownloader::new(
            "yt-dlp",
            "https://www.youtube.com/watch?v={id}",
            "mp4",
        );
        let reference = SourceReference::parse("abc123").unwrap();
        assert_eq!(
            downloader.source_url(&reference),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = YtDlpDownloader::new("definitely-not-a-real-downloader", "{id}", "mp4");
        let reference = SourceReference::parse("v1").unwrap();

        let err = downloader
            .download(&reference, &dir.path().join("downloaded_video_v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Download { .. }));
    }
}
