use super::{Encoder, describe_failure, encoded_output_path};
use crate::error::{PipelineError, PipelineResult};
use crate::modules::video::TranscodeTarget;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Encodes by running `ffmpeg`; the container and codecs follow from the
/// output extension.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        target: &TranscodeTarget,
        output_dir: &Path,
    ) -> PipelineResult<PathBuf> {
        let output_path = encoded_output_path(input, target, output_dir);

        info!(input = %input.display(), %target, "🎞️ Encoding");

        let output = Command::new(&self.program)
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-y") // overwrite
            .arg("-i")
            .arg(input)
            .arg(&output_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PipelineError::Encode {
                target: target.to_string(),
                reason: format!("cannot run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Encode {
                target: target.to_string(),
                reason: describe_failure(&self.program, &output),
            });
        }

        Ok(output_path)
    }
}
