use crate::error::PipelineResult;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::warn;

/// Root under which workers stage files between the blob store and the
/// external tools.
#[derive(Clone, Debug)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh `<root>/<prefix>-<random>` directory owned by the caller.
    pub async fn create_dir(&self, prefix: &str) -> PipelineResult<ScratchDir> {
        fs::create_dir_all(&self.root).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", prefix))
            .tempdir_in(&self.root)?;
        Ok(ScratchDir { dir })
    }
}

/// Scratch directory that is deleted with everything in it when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Deletes the directory off the runtime threads and logs a failure.
    pub async fn remove(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {}
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Failed to remove scratch directory")
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Scratch cleanup task failed")
            }
        }
    }
}

/// Deletes one scratch file; a file that is already gone is not an error.
pub async fn remove_scratch_file(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}
