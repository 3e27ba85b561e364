use crate::config::{RemoteConfig, RemoteKind};
use crate::error::{ProcessingError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// A place published artifacts are copied to after a successful run.
pub trait ArtifactStore: Send + Sync {
    /// Copy `path` to `destination`, a name relative to the store's root.
    fn copy_to(&self, path: &Path, destination: &str) -> Result<()>;

    fn describe(&self) -> String;
}

/// Copies into a local or mounted directory.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactStore for DirectoryStore {
    fn copy_to(&self, path: &Path, destination: &str) -> Result<()> {
        let target = self.root.join(destination);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(path, &target)?;
        info!("Copied {} to {}", path.display(), target.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Copies with `rclone copyto <path> <remote>/<destination>`.
pub struct RcloneStore {
    remote: String,
    program: String,
}

impl RcloneStore {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            program: "rclone".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn target(&self, destination: &str) -> String {
        format!("{}/{}", self.remote.trim_end_matches('/'), destination)
    }
}

impl ArtifactStore for RcloneStore {
    fn copy_to(&self, path: &Path, destination: &str) -> Result<()> {
        let target = self.target(destination);
        let upload_error = |message: String| ProcessingError::Upload {
            path: path.display().to_string(),
            destination: target.clone(),
            message,
        };

        let output = Command::new(&self.program)
            .arg("copyto")
            .arg(path)
            .arg(&target)
            .output()
            .map_err(|e| upload_error(e.to_string()))?;

        if !output.status.success() {
            return Err(upload_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!("Uploaded {} to {}", path.display(), target);
        Ok(())
    }

    fn describe(&self) -> String {
        self.remote.clone()
    }
}

/// Build the configured store.
pub fn store_from_config(remote: &RemoteConfig) -> Box<dyn ArtifactStore> {
    match remote.kind {
        RemoteKind::Directory => Box::new(DirectoryStore::new(&remote.destination)),
        RemoteKind::Rclone => Box::new(RcloneStore::new(&remote.destination)),
    }
}
