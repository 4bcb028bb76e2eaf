//! Domain types and validators for the static ops configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

static FEATURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // compile-time constant pattern
    Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid feature name pattern")
});

static UNIT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // compile-time constant pattern
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("valid unit name pattern")
});

static LOG_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // compile-time constant pattern
    Regex::new(r"^[0-9]+[kMG]?$").expect("valid size pattern")
});

/// Addresses the API may bind to.
pub const WILDCARD_BINDS: [&str; 2] = ["0.0.0.0", "::"];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `/etc/ndt/ops.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OpsConfig {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub credentials: CredentialConfig,
    pub cloud: CloudConfig,
    pub cache: CacheConfig,
    pub container: ContainerConfig,
    pub runtime: RuntimeConfig,
    pub thresholds: ThresholdConfig,
    pub metadata: MetadataConfig,
    pub timeouts: TimeoutConfig,
    pub restart: RestartConfig,
    pub log_rotation: LogRotationConfig,
    pub firewall: FirewallConfig,
    /// Feature flags exported to the managed service as `NDT_FEATURE_<NAME>`.
    pub features: BTreeMap<String, bool>,
}

/// Identity and filesystem layout of the managed service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service-manager unit name (without `.service`).
    pub name: String,
    /// Account the service runs as.
    pub user: String,
    pub install_dir: String,
    /// Where the generated artifact set is written.
    pub artifact_dir: String,
    /// Where the process handle record lives. Kept on tmpfs so a reboot
    /// discards it.
    pub run_dir: String,
    pub log_dir: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "ndt-manager".to_string(),
            user: "ubuntu".to_string(),
            install_dir: "/opt/ndt".to_string(),
            artifact_dir: "/opt/ndt/config".to_string(),
            run_dir: "/run/ndt".to_string(),
            log_dir: "/opt/ndt/logs".to_string(),
        }
    }
}

/// HTTP surface of the managed application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,
    pub workers: u32,
    pub health_path: String,
    pub server_program: String,
    pub app_module: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8000,
            workers: 4,
            health_path: "/health".to_string(),
            server_program: "/opt/ndt/venv/bin/uvicorn".to_string(),
            app_module: "ndt_manager:app".to_string(),
        }
    }
}

/// Cloud credential file location and the mode it must carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialConfig {
    pub path: String,
    /// Octal permission string, e.g. `"600"`.
    pub mode: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            path: "/home/ubuntu/.aws/credentials".to_string(),
            mode: "600".to_string(),
        }
    }
}

impl CredentialConfig {
    /// Parse the configured octal mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode is not a valid octal permission.
    pub fn required_mode(&self) -> Result<u32, ConfigError> {
        let trimmed = self.mode.trim_start_matches("0o");
        u32::from_str_radix(trimmed, 8)
            .ok()
            .filter(|m| *m <= 0o7777)
            .ok_or_else(|| ConfigError::InvalidMode(self.mode.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    /// Cloud CLI used for identity and permission calls.
    pub cli: String,
    /// Region override; the CLI's own resolution applies when unset.
    pub region: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            cli: "aws".to_string(),
            region: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub service: String,
    pub host: String,
    pub port: u16,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            service: "redis-server".to_string(),
            host: "127.0.0.1".to_string(),
            port: 6379,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    pub service: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            service: "docker".to_string(),
        }
    }
}

/// Interpreter and packages the managed application imports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub python: String,
    pub packages: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            python: "/opt/ndt/venv/bin/python".to_string(),
            packages: ["fastapi", "uvicorn", "boto3", "paramiko", "yaml", "pydantic"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Resource ceilings, in percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    /// Mount point sampled for storage usage.
    pub disk_mount: String,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: 90.0,
            memory: 90.0,
            disk: 90.0,
            disk_mount: "/".to_string(),
        }
    }
}

/// Local metadata service endpoint and per-field fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataConfig {
    pub endpoint: String,
    pub token_ttl_secs: u64,
    pub timeout_ms: u64,
    pub fallback: IdentityFallback,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://169.254.169.254/latest".to_string(),
            token_ttl_secs: 21600,
            timeout_ms: 2000,
            fallback: IdentityFallback::default(),
        }
    }
}

impl MetadataConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Literal used for each identity field when the metadata service cannot
/// supply it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentityFallback {
    pub instance_type: String,
    pub instance_id: String,
    pub public_ip: String,
    pub private_ip: String,
    pub region: String,
    pub availability_zone: String,
}

impl Default for IdentityFallback {
    fn default() -> Self {
        Self {
            instance_type: "unknown".to_string(),
            instance_id: "local".to_string(),
            public_ip: "127.0.0.1".to_string(),
            private_ip: "127.0.0.1".to_string(),
            region: "us-east-1".to_string(),
            availability_zone: "us-east-1a".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for each external command.
    pub command_secs: u64,
    /// Upper bound for each HTTP request.
    pub http_secs: u64,
    /// Wait between graceful and forced termination.
    pub stop_grace_secs: u64,
    /// Wait after asking the service manager to start a dependency.
    pub remediation_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 10,
            http_secs: 5,
            stop_grace_secs: 10,
            remediation_grace_secs: 3,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    #[must_use]
    pub fn remediation_grace(&self) -> Duration {
        Duration::from_secs(self.remediation_grace_secs)
    }
}

/// Restart policy written into the process unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestartConfig {
    pub delay_secs: u64,
    /// Restarts allowed within `interval_secs` before the manager gives up.
    pub burst: u32,
    pub interval_secs: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10,
            burst: 5,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogRotationConfig {
    pub max_size: String,
    pub max_age_days: u32,
    pub retain: u32,
}

impl Default for LogRotationConfig {
    fn default() -> Self {
        Self {
            max_size: "100M".to_string(),
            max_age_days: 30,
            retain: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FirewallConfig {
    pub ssh_port: u16,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self { ssh_port: 22 }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validate a configuration before any command uses it.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found.
pub fn validate_config(cfg: &OpsConfig) -> Result<()> {
    for (key, value) in [
        ("thresholds.cpu", cfg.thresholds.cpu),
        ("thresholds.memory", cfg.thresholds.memory),
        ("thresholds.disk", cfg.thresholds.disk),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            return Err(ConfigError::InvalidThreshold { key, value }.into());
        }
    }
    if cfg.api.workers == 0 {
        return Err(ConfigError::InvalidWorkers(cfg.api.workers).into());
    }
    cfg.credentials.required_mode()?;
    if let Some(name) = cfg.features.keys().find(|k| !FEATURE_NAME.is_match(k)) {
        return Err(ConfigError::InvalidFeatureName(name.clone()).into());
    }
    for (key, port) in [
        ("api", cfg.api.port),
        ("cache", cfg.cache.port),
        ("firewall.ssh", cfg.firewall.ssh_port),
    ] {
        if port == 0 {
            return Err(ConfigError::InvalidPort { key, port }.into());
        }
    }
    if cfg.firewall.ssh_port == cfg.api.port {
        return Err(ConfigError::PortConflict(cfg.api.port).into());
    }
    // These names end up in unit files, systemctl arguments and the
    // firewall script.
    for (key, value) in [
        ("service.name", &cfg.service.name),
        ("cache.service", &cfg.cache.service),
        ("container.service", &cfg.container.service),
    ] {
        if !UNIT_NAME.is_match(value) {
            return Err(ConfigError::InvalidUnitName {
                key,
                value: value.clone(),
            }
            .into());
        }
    }
    if !LOG_SIZE.is_match(&cfg.log_rotation.max_size) {
        return Err(ConfigError::InvalidMaxSize(cfg.log_rotation.max_size.clone()).into());
    }
    if !WILDCARD_BINDS.contains(&cfg.api.bind_host.as_str()) {
        return Err(ConfigError::NonWildcardBind(cfg.api.bind_host.clone()).into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
