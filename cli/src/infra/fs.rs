//! Filesystem infrastructure: implements the `LocalFs` port.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::LocalFs;

/// Production filesystem implementation of `LocalFs`.
pub struct HostFs;

impl LocalFs for HostFs {
    async fn file_mode(&self, path: &Path) -> Result<Option<u32>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || file_mode_sync(&path))
            .await
            .context("file_mode task panicked")?
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || set_mode_sync(&path, mode))
            .await
            .context("set_mode task panicked")?
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        let path = path.to_path_buf();
        let contents = contents.to_vec();
        tokio::task::spawn_blocking(move || write_atomic_sync(&path, &contents, mode))
            .await
            .context("write_atomic task panicked")?
    }
}

fn file_mode_sync(path: &Path) -> Result<Option<u32>> {
    match std::fs::metadata(path) {
        #[cfg(unix)]
        Ok(meta) => {
            use std::os::unix::fs::PermissionsExt;
            Ok(Some(meta.permissions().mode() & 0o7777))
        }
        #[cfg(not(unix))]
        Ok(meta) => Ok(Some(if meta.permissions().readonly() { 0o444 } else { 0o644 })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("stat {}", path.display())),
    }
}

fn set_mode_sync(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

/// Write via a temp file in the target directory, then rename over `path`.
/// Readers see either the old file or the new one, never a partial write.
fn write_atomic_sync(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating directory {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file for {}", path.display()))?;
    set_mode_sync(tmp.path(), mode)?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}
