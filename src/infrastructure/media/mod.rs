pub mod ffmpeg;
pub mod ytdlp;

use crate::error::PipelineResult;
use crate::modules::video::{SourceReference, TranscodeTarget};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;

pub use ffmpeg::FfmpegEncoder;
pub use ytdlp::YtDlpDownloader;

/// Fetches source media for a reference.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Writes the media to `<base_path>.<ext>` and returns that path.
    async fn download(
        &self,
        reference: &SourceReference,
        base_path: &Path,
    ) -> PipelineResult<PathBuf>;
}

/// Converts a local file to one output format.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Writes `<output_dir>/<input stem>.<target>` and returns that path.
    async fn encode(
        &self,
        input: &Path,
        target: &TranscodeTarget,
        output_dir: &Path,
    ) -> PipelineResult<PathBuf>;
}

/// Output path an encoder writes for `input` and `target`.
pub fn encoded_output_path(input: &Path, target: &TranscodeTarget, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}.{}", stem, target.extension()))
}

/// Short description of a failed subprocess, with the end of its stderr.
pub(crate) fn describe_failure(program: &str, output: &Output) -> String {
    const MAX_STDERR: usize = 512;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let tail = match stderr.char_indices().rev().nth(MAX_STDERR) {
        Some((idx, _)) => &stderr[idx..],
        None => stderr,
    };

    if tail.is_empty() {
        format!("{} exited with {}", program, output.status)
    } else {
        format!("{} exited with {}: {}", program, output.status, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_uses_input_stem_and_target_extension() {
        let target = TranscodeTarget::parse("webm").unwrap();
        let path = encoded_output_path(
            Path::new("/scratch/job/source/x.mp4"),
            &target,
            Path::new("/scratch/job"),
        );
        assert_eq!(path, PathBuf::from("/scratch/job/x.webm"));
    }
}
