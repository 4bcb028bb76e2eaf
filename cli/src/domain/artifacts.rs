//! Typed configuration artifacts and their serializers.
//!
//! `generate` is a pure function of `(InstanceIdentity, OpsConfig)`. It never
//! reads the clock, the environment, or the filesystem, so identical inputs
//! always produce byte-identical artifacts.

use std::fmt::Write as _;

use serde::Serialize;

use crate::domain::config::OpsConfig;
use crate::domain::identity::InstanceIdentity;

pub const ENV_FILE_NAME: &str = "ndt.env";
pub const LOGROTATE_FILE_NAME: &str = "ndt.logrotate";
pub const FIREWALL_FILE_NAME: &str = "ndt-firewall.sh";

// ── Environment file ──────────────────────────────────────────────────────────

/// Ordered `KEY=value` entries with fully resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvFile {
    entries: Vec<(String, String)>,
}

impl EnvFile {
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{key}={}", quote_env_value(value));
        }
        out
    }
}

/// Quote a value so shells, systemd, and dotenv loaders all read it back
/// literally.
fn quote_env_value(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._:/@%+,-".contains(c));
    if plain {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' | '$' | '`' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Parse an environment file produced by [`EnvFile::render`].
#[must_use]
pub fn parse_env_file(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), unquote_env_value(v.trim())))
        .collect()
}

fn unquote_env_value(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ── Process unit ──────────────────────────────────────────────────────────────

/// Service-manager unit for the managed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessUnit {
    pub description: String,
    pub after: Vec<String>,
    pub requires: Vec<String>,
    /// Restart-storm limiter window.
    pub start_limit_interval_secs: u64,
    /// Restarts allowed inside the window.
    pub start_limit_burst: u32,
    pub user: String,
    pub working_directory: String,
    pub environment_file: String,
    pub exec_start: Vec<String>,
    pub restart_delay_secs: u64,
    pub wanted_by: String,
}

impl ProcessUnit {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[Unit]");
        let _ = writeln!(out, "Description={}", self.description);
        let _ = writeln!(out, "After={}", self.after.join(" "));
        let _ = writeln!(out, "Requires={}", self.requires.join(" "));
        let _ = writeln!(out, "StartLimitIntervalSec={}", self.start_limit_interval_secs);
        let _ = writeln!(out, "StartLimitBurst={}", self.start_limit_burst);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Service]");
        let _ = writeln!(out, "Type=simple");
        let _ = writeln!(out, "User={}", self.user);
        let _ = writeln!(out, "WorkingDirectory={}", self.working_directory);
        let _ = writeln!(out, "EnvironmentFile={}", self.environment_file);
        let argv: Vec<String> = self.exec_start.iter().map(|a| quote_unit_arg(a)).collect();
        let _ = writeln!(out, "ExecStart={}", argv.join(" "));
        let _ = writeln!(out, "Restart=always");
        let _ = writeln!(out, "RestartSec={}", self.restart_delay_secs);
        let _ = writeln!(out);
        let _ = writeln!(out, "[Install]");
        let _ = writeln!(out, "WantedBy={}", self.wanted_by);
        out
    }
}

fn quote_unit_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || "\"'\\;$%".contains(c)) {
        return arg.to_string();
    }
    let escaped = arg
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "%%")
        .replace('$', "$$");
    format!("\"{escaped}\"")
}

// ── Log rotation ──────────────────────────────────────────────────────────────

/// Rotation policy for the managed service's logs.
///
/// Rotation always truncates in place so the running process keeps a valid
/// file handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRotationPolicy {
    pub pattern: String,
    pub max_size: String,
    pub max_age_days: u32,
    pub retain: u32,
}

impl LogRotationPolicy {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {{", self.pattern);
        for directive in [
            "daily".to_string(),
            format!("maxsize {}", self.max_size),
            format!("maxage {}", self.max_age_days),
            format!("rotate {}", self.retain),
            "missingok".to_string(),
            "notifempty".to_string(),
            "compress".to_string(),
            "delaycompress".to_string(),
            "copytruncate".to_string(),
        ] {
            let _ = writeln!(out, "    {directive}");
        }
        let _ = writeln!(out, "}}");
        out
    }
}

// ── Firewall ──────────────────────────────────────────────────────────────────

/// One inbound allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowRule {
    pub name: String,
    pub port: u16,
}

/// Default-deny inbound policy with exactly two allowances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallPolicy {
    pub allow: [AllowRule; 2],
}

impl FirewallPolicy {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#!/bin/sh");
        let _ = writeln!(out, "set -e");
        let _ = writeln!(out, "ufw --force reset");
        let _ = writeln!(out, "ufw default deny incoming");
        let _ = writeln!(out, "ufw default allow outgoing");
        for rule in &self.allow {
            let _ = writeln!(out, "ufw allow {}/tcp comment '{}'", rule.port, rule.name);
        }
        let _ = writeln!(out, "ufw --force enable");
        out
    }
}

// ── Artifact set ──────────────────────────────────────────────────────────────

/// One rendered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
    pub mode: u32,
}

/// The complete set written by one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifactSet {
    pub environment_file: Artifact,
    pub process_unit: Artifact,
    pub log_rotation: Artifact,
    pub firewall: Artifact,
}

impl ConfigArtifactSet {
    /// Artifacts in write order.
    #[must_use]
    pub fn iter(&self) -> [&Artifact; 4] {
        [
            &self.environment_file,
            &self.process_unit,
            &self.log_rotation,
            &self.firewall,
        ]
    }
}

/// Argument vector that starts the managed application.
#[must_use]
pub fn server_argv(cfg: &OpsConfig) -> Vec<String> {
    vec![
        cfg.api.server_program.clone(),
        cfg.api.app_module.clone(),
        "--host".to_string(),
        cfg.api.bind_host.clone(),
        "--port".to_string(),
        cfg.api.port.to_string(),
        "--workers".to_string(),
        cfg.api.workers.to_string(),
    ]
}

/// Build the ordered environment file.
#[must_use]
pub fn environment(identity: &InstanceIdentity, cfg: &OpsConfig) -> EnvFile {
    let mut env = EnvFile::default();
    env.push("NDT_INSTANCE_TYPE", &identity.instance_type);
    env.push("NDT_INSTANCE_ID", &identity.instance_id);
    env.push("NDT_PUBLIC_IP", &identity.public_ip);
    env.push("NDT_PRIVATE_IP", &identity.private_ip);
    env.push("NDT_REGION", &identity.region);
    env.push("NDT_AVAILABILITY_ZONE", &identity.availability_zone);
    env.push(
        "AWS_DEFAULT_REGION",
        cfg.cloud.region.as_deref().unwrap_or(&identity.region),
    );
    env.push("NDT_CREDENTIALS_PATH", &cfg.credentials.path);
    env.push("NDT_BIND_HOST", &cfg.api.bind_host);
    env.push("NDT_PORT", cfg.api.port.to_string());
    env.push("PORT", cfg.api.port.to_string());
    env.push("NDT_WORKERS", cfg.api.workers.to_string());
    env.push("NDT_CPU_THRESHOLD", format!("{}", cfg.thresholds.cpu));
    env.push("NDT_MEMORY_THRESHOLD", format!("{}", cfg.thresholds.memory));
    env.push("NDT_DISK_THRESHOLD", format!("{}", cfg.thresholds.disk));
    for (name, enabled) in &cfg.features {
        env.push(
            format!("NDT_FEATURE_{}", name.to_ascii_uppercase()),
            enabled.to_string(),
        );
    }
    env
}

/// Generate the full artifact set.
#[must_use]
pub fn generate(identity: &InstanceIdentity, cfg: &OpsConfig) -> ConfigArtifactSet {
    let env_path = format!("{}/{ENV_FILE_NAME}", cfg.service.artifact_dir);
    let container_unit = format!("{}.service", cfg.container.service);

    let unit = ProcessUnit {
        description: format!("NDT manager ({})", identity.instance_id),
        after: vec!["network.target".to_string(), container_unit.clone()],
        requires: vec![container_unit],
        start_limit_interval_secs: cfg.restart.interval_secs,
        start_limit_burst: cfg.restart.burst,
        user: cfg.service.user.clone(),
        working_directory: cfg.service.install_dir.clone(),
        environment_file: env_path,
        exec_start: server_argv(cfg),
        restart_delay_secs: cfg.restart.delay_secs,
        wanted_by: "multi-user.target".to_string(),
    };

    let rotation = LogRotationPolicy {
        pattern: format!("{}/*.log", cfg.service.log_dir),
        max_size: cfg.log_rotation.max_size.clone(),
        max_age_days: cfg.log_rotation.max_age_days,
        retain: cfg.log_rotation.retain,
    };

    let firewall = FirewallPolicy {
        allow: [
            AllowRule {
                name: "ssh".to_string(),
                port: cfg.firewall.ssh_port,
            },
            AllowRule {
                name: cfg.service.name.clone(),
                port: cfg.api.port,
            },
        ],
    };

    ConfigArtifactSet {
        environment_file: Artifact {
            file_name: ENV_FILE_NAME.to_string(),
            contents: environment(identity, cfg).render(),
            mode: 0o640,
        },
        process_unit: Artifact {
            file_name: format!("{}.service", cfg.service.name),
            contents: unit.render(),
            mode: 0o644,
        },
        log_rotation: Artifact {
            file_name: LOGROTATE_FILE_NAME.to_string(),
            contents: rotation.render(),
            mode: 0o644,
        },
        firewall: Artifact {
            file_name: FIREWALL_FILE_NAME.to_string(),
            contents: firewall.render(),
            mode: 0o750,
        },
    }
}
