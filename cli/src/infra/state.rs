//! Infrastructure implementation of the `HandleStore` port.
//!
//! `HandleFile` persists the process handle as JSON in the run directory,
//! using `tokio::task::spawn_blocking` and an atomic temp-file-then-rename
//! write so a killed run never leaves a truncated record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::HandleStore;
use crate::domain::lifecycle::ProcessHandle;

/// File name of the handle record inside the run directory.
pub const HANDLE_FILE: &str = "ndt-manager.json";

/// Process handle file manager.
pub struct HandleFile {
    path: PathBuf,
}

impl HandleFile {
    /// Handle record inside `run_dir`.
    #[must_use]
    pub fn in_dir(run_dir: &Path) -> Self {
        Self::with_path(run_dir.join(HANDLE_FILE))
    }

    /// Create a handle store with an explicit path (used in tests).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_sync(path: &Path) -> Result<Option<ProcessHandle>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading handle file {}", path.display()))?;
        let handle: ProcessHandle = serde_json::from_str(&content)
            .with_context(|| format!("parsing handle file {}", path.display()))?;
        Ok(Some(handle))
    }

    fn save_sync(path: &Path, handle: &ProcessHandle) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(handle).context("serializing handle")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing handle file {}", path.display()))?;
        Ok(())
    }

    fn clear_sync(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing handle file {}", path.display())),
        }
    }
}

impl HandleStore for HandleFile {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("handle load task panicked")?
    }

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<()> {
        let path = self.path.clone();
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &handle))
            .await
            .context("handle save task panicked")?
    }

    async fn clear_handle(&self) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::clear_sync(&path))
            .await
            .context("handle clear task panicked")?
    }
}
