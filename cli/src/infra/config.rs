//! Loading the static ops configuration from YAML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::{OpsConfig, validate_config};

/// System-wide configuration path.
pub const SYSTEM_CONFIG: &str = "/etc/ndt/ops.yaml";

/// Resolves and loads `OpsConfig`.
///
/// Lookup order: explicit path (flag or `NDT_OPS_CONFIG`), then
/// [`SYSTEM_CONFIG`], then `~/.ndt/ops.yaml`, else built-in defaults.
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let mut candidates = vec![PathBuf::from(SYSTEM_CONFIG)];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".ndt").join("ops.yaml"));
        }
        Self {
            explicit,
            candidates,
        }
    }

    /// Store with a fixed candidate list (used in tests).
    #[must_use]
    pub fn with_candidates(explicit: Option<PathBuf>, candidates: Vec<PathBuf>) -> Self {
        Self {
            explicit,
            candidates,
        }
    }

    /// The file that will be read, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path was given but does not exist.
    pub fn path(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            return Ok(Some(path.clone()));
        }
        Ok(self.candidates.iter().find(|p| p.exists()).cloned())
    }

    /// Load and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn load(&self) -> Result<OpsConfig> {
        let cfg = match self.path()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                read_yaml(&path)?
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                OpsConfig::default()
            }
        };
        validate_config(&cfg)?;
        Ok(cfg)
    }
}

fn read_yaml(path: &Path) -> Result<OpsConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(OpsConfig::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}
