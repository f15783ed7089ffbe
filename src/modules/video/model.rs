use crate::error::{PipelineError, PipelineResult};
use std::fmt;

/// Identifier of a piece of source media, e.g. a catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceReference(String);

impl SourceReference {
    /// The reference ends up in a scratch file name and a blob key, so it must
    /// be a single path segment.
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PipelineError::Config("empty source reference".to_string()));
        }
        if raw.contains('/') || raw.contains('\\') || raw.contains("..") {
            return Err(PipelineError::Config(format!(
                "source reference '{}' must not contain path separators",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of an object in the blob store, e.g. `videos/downloaded_video_v1.mp4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One output format, named by its file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranscodeTarget(String);

impl TranscodeTarget {
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PipelineError::Config(format!(
                "invalid transcode target '{}'",
                raw
            )));
        }
        Ok(Self(ext))
    }

    /// Parses a comma separated list, dropping duplicates but keeping order.
    pub fn parse_list(raw: &str) -> PipelineResult<Vec<Self>> {
        let mut targets: Vec<Self> = Vec::new();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let target = Self::parse(part)?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        if targets.is_empty() {
            return Err(PipelineError::Config(
                "at least one transcode target is required".to_string(),
            ));
        }
        Ok(targets)
    }

    pub fn extension(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TranscodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefixes of the two blob store namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub originals_prefix: String,
    pub encoded_prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            originals_prefix: "videos".to_string(),
            encoded_prefix: "encoded".to_string(),
        }
    }
}

impl KeyLayout {
    pub fn original_key(&self, file_name: &str) -> BlobKey {
        BlobKey::new(format!("{}/{}", self.originals_prefix, file_name))
    }

    pub fn encoded_key(&self, stem: &str, target: &TranscodeTarget) -> BlobKey {
        BlobKey::new(format!(
            "{}/{}.{}",
            self.encoded_prefix,
            stem,
            target.extension()
        ))
    }

    /// Every output key a given original produces.
    pub fn encoded_keys(&self, original: &BlobKey, targets: &[TranscodeTarget]) -> Vec<BlobKey> {
        targets
            .iter()
            .map(|target| self.encoded_key(original.stem(), target))
            .collect()
    }
}

/// Base name (without extension) the downloader writes a reference to.
pub fn download_base_name(reference: &SourceReference) -> String {
    format!("downloaded_video_{}", reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_reference_rejects_path_segments() {
        assert!(SourceReference::parse("v1").is_ok());
        assert!(SourceReference::parse("  v1 ").is_ok());
        assert!(SourceReference::parse("").is_err());
        assert!(SourceReference::parse("a/b").is_err());
        assert!(SourceReference::parse("..").is_err());
    }

    #[test]
    fn blob_key_file_name_and_stem() {
        let key = BlobKey::new("videos/downloaded_video_v1.mp4");
        assert_eq!(key.file_name(), "downloaded_video_v1.mp4");
        assert_eq!(key.stem(), "downloaded_video_v1");

        let bare = BlobKey::new("noext");
        assert_eq!(bare.file_name(), "noext");
        assert_eq!(bare.stem(), "noext");

        let dotted = BlobKey::new("videos/.hidden");
        assert_eq!(dotted.stem(), ".hidden");
    }

    #[test]
    fn target_list_is_normalized_and_deduplicated() {
        let targets = TranscodeTarget::parse_list("mp4, .AVI,webm,mp4,,mkv").unwrap();
        let exts: Vec<&str> = targets.iter().map(|t| t.extension()).collect();
        assert_eq!(exts, vec!["mp4", "avi", "webm", "mkv"]);

        assert!(TranscodeTarget::parse_list("").is_err());
        assert!(TranscodeTarget::parse("mp 4").is_err());
    }

    #[test]
    fn layout_derives_keys_from_original_stem() {
        let layout = KeyLayout::default();
        let reference = SourceReference::parse("v1").unwrap();
        let original = layout.original_key(&format!("{}.mp4", download_base_name(&reference)));
        assert_eq!(original.as_str(), "videos/downloaded_video_v1.mp4");

        let targets = TranscodeTarget::parse_list("mp4,avi").unwrap();
        let keys: Vec<String> = layout
            .encoded_keys(&BlobKey::new("videos/x.mp4"), &targets)
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, vec!["encoded/x.mp4", "encoded/x.avi"]);
    }
}
