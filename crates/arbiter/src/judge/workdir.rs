//! Per-call working directories
//!
//! Every judge call owns one fresh directory. It is removed by
//! [`WorkDir::cleanup`] on the normal path; the `Drop` implementation covers
//! early returns and panics.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum WorkDirError {
    #[error("failed to create working directory under {}: {source}", root.display())]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An exclusive, ephemeral working directory
#[derive(Debug)]
pub struct WorkDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkDir {
    /// Create a directory named `<prefix><random>` under `root`, or under the
    /// system temp directory if `root` is `None`
    pub fn create(prefix: &str, root: Option<&Path>) -> Result<Self, WorkDirError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);

        let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        let dir = builder
            .tempdir_in(&root)
            .map_err(|source| WorkDirError::Create { root, source })?;
        let path = dir.path().to_path_buf();

        debug!(path = %path.display(), "created working directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything in it
    ///
    /// Individual deletion failures are logged and skipped.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn cleanup(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || {
            remove_tree(dir.path());
            dir.close()
        })
        .await;

        match result {
            Ok(Ok(())) => debug!("working directory removed"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "failed to remove working directory"),
            Err(e) => warn!(path = %path.display(), error = %e, "cleanup task failed"),
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            debug!(path = %self.path.display(), "working directory dropped without cleanup");
            remove_tree(dir.path());
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "failed to remove working directory");
            }
        }
    }
}

/// Remove the contents of `root`, depth first, logging failures
fn remove_tree(root: &Path) {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "failed to list directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            remove_tree(&path);
            if let Err(e) = std::fs::remove_dir(&path) {
                warn!(path = %path.display(), error = %e, "failed to delete directory");
            }
        } else if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to delete file");
        }
    }
}
