//! Application service: dependency check registry runner.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Every probe converts its own errors into a [`ProbeOutcome`]; nothing here
//! returns early, so one run always yields one result per requested check.
//! A check whose parent did not pass reports OK as "not applicable" so the
//! parent's failure is counted once.

use std::path::PathBuf;

use crate::application::ports::{CommandRunner, HostEnvironment, HttpResponse, ProgressReporter};
use crate::application::services::lifecycle::handle_is_live;
use crate::application::services::remediation::{self, RemediationAction};
use crate::domain::check::{
    CheckDefinition, CheckId, CheckResult, ProbeOutcome, RemediationKind, classify_health_payload,
    classify_mode, classify_threshold,
};
use crate::domain::config::OpsConfig;

/// Liveness URL of the managed application, always probed over loopback.
#[must_use]
pub fn liveness_url(cfg: &OpsConfig) -> String {
    format!("http://127.0.0.1:{}{}", cfg.api.port, cfg.api.health_path)
}

/// Run `ids` in order. With `remediate`, each remediable failure gets exactly
/// one corrective attempt.
pub async fn run_checks(
    host: &impl HostEnvironment,
    cfg: &OpsConfig,
    ids: &[CheckId],
    remediate: bool,
    reporter: &impl ProgressReporter,
) -> Vec<CheckResult> {
    let mut run = CheckRun::new(host, cfg);
    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let def = id.definition();
        reporter.step(&format!("checking {}...", def.name));
        let outcome = run.probe(*id).await;
        let remediable = matches!(outcome, ProbeOutcome::Fail { remediable: true, .. });
        let result = CheckResult::from_outcome(&def, outcome);
        let result = match def.remediation {
            Some(kind) if remediate && remediable => {
                reporter.step(&format!("remediating {}...", def.name));
                run.remediate(&def, kind, result).await
            }
            _ => result,
        };
        tracing::debug!(check = def.name, status = result.status.as_str(), message = %result.message);
        results.push(result);
    }
    results
}

/// Per-run memo of observations shared between dependent checks.
struct CheckRun<'a, H> {
    host: &'a H,
    cfg: &'a OpsConfig,
    liveness: Option<Result<HttpResponse, String>>,
    credentials_valid: Option<bool>,
    container_active: Option<bool>,
}

impl<'a, H: HostEnvironment> CheckRun<'a, H> {
    fn new(host: &'a H, cfg: &'a OpsConfig) -> Self {
        Self {
            host,
            cfg,
            liveness: None,
            credentials_valid: None,
            container_active: None,
        }
    }

    async fn probe(&mut self, id: CheckId) -> ProbeOutcome {
        match id {
            CheckId::ManagedProcess => self.managed_process().await,
            // Any HTTP answer means the server is up; what it says about
            // itself is the payload check's concern.
            CheckId::ApiLiveness => match self.liveness().await {
                Ok(resp) => ProbeOutcome::pass(format!("HTTP {}", resp.status)),
                Err(e) => ProbeOutcome::fail(format!("unreachable: {e}")),
            },
            CheckId::ApiPayload => match self.liveness().await {
                Ok(resp) => classify_health_payload(&resp.body),
                Err(_) => ProbeOutcome::pass("not applicable: API unreachable"),
            },
            CheckId::CloudCredentials => self.cloud_credentials().await,
            CheckId::CloudPermissions => self.cloud_permissions().await,
            CheckId::CredentialFile => self.credential_file().await,
            CheckId::CredentialMode => self.credential_mode().await,
            CheckId::Cache => probe_cache(self.host, self.cfg).await,
            CheckId::ContainerService => {
                if self.container_active().await {
                    ProbeOutcome::pass(format!("{} active", self.cfg.container.service))
                } else {
                    ProbeOutcome::fail(format!("{} inactive", self.cfg.container.service))
                }
            }
            CheckId::ContainerDaemon => self.container_daemon().await,
            CheckId::RuntimePackages => self.runtime_packages().await,
            CheckId::CpuThreshold => threshold("cpu", self.host.cpu_percent().await, self.cfg.thresholds.cpu),
            CheckId::MemoryThreshold => threshold(
                "memory",
                self.host.memory_percent().await,
                self.cfg.thresholds.memory,
            ),
            CheckId::DiskThreshold => threshold(
                "disk",
                self.host
                    .disk_percent(&self.cfg.thresholds.disk_mount)
                    .await,
                self.cfg.thresholds.disk,
            ),
        }
    }

    async fn managed_process(&self) -> ProbeOutcome {
        let unit = &self.cfg.service.name;
        match self.host.is_registered(unit).await {
            Ok(true) => match self.host.active_state(unit).await {
                Ok(state) if state.trim() == "active" => ProbeOutcome::pass(format!("{unit} active")),
                Ok(state) => ProbeOutcome::fail(format!("{unit} {}", state.trim())),
                Err(e) => ProbeOutcome::fail(format!("cannot query {unit}: {e:#}")),
            },
            Ok(false) => match self.host.load_handle().await {
                Ok(Some(handle)) => {
                    if handle_is_live(self.host, &handle).await {
                        ProbeOutcome::pass(format!("pid {} running", handle.pid))
                    } else {
                        ProbeOutcome::fail(format!("recorded pid {} is gone", handle.pid))
                    }
                }
                Ok(None) => ProbeOutcome::fail("not running"),
                Err(e) => ProbeOutcome::fail(format!("cannot read process handle: {e:#}")),
            },
            Err(e) => ProbeOutcome::fail(format!("cannot query service manager: {e:#}")),
        }
    }

    async fn liveness(&mut self) -> Result<HttpResponse, String> {
        if let Some(cached) = &self.liveness {
            return cached.clone();
        }
        let observed = self
            .host
            .get(&liveness_url(self.cfg))
            .await
            .map_err(|e| format!("{e:#}"));
        self.liveness = Some(observed.clone());
        observed
    }

    fn cloud_args<'b>(&'b self, args: &[&'b str]) -> Vec<&'b str> {
        let mut all = args.to_vec();
        if let Some(region) = self.cfg.cloud.region.as_deref() {
            all.extend(["--region", region]);
        }
        all.extend(["--output", "json"]);
        all
    }

    async fn cloud_credentials(&mut self) -> ProbeOutcome {
        let args = self.cloud_args(&["sts", "get-caller-identity"]);
        let outcome = match run_ok(self.host, self.cfg, &self.cfg.cloud.cli, &args).await {
            Ok(stdout) => {
                let arn = serde_json::from_str::<serde_json::Value>(&stdout)
                    .ok()
                    .and_then(|v| v.get("Arn").and_then(|a| a.as_str()).map(String::from));
                ProbeOutcome::pass(arn.map_or_else(|| "identity valid".to_string(), |a| format!("identity {a}")))
            }
            Err(e) => ProbeOutcome::fail(format!("identity call failed: {e}")),
        };
        self.credentials_valid = Some(matches!(outcome, ProbeOutcome::Pass(_)));
        outcome
    }

    async fn cloud_permissions(&mut self) -> ProbeOutcome {
        let valid = match self.credentials_valid {
            Some(v) => v,
            None => matches!(self.cloud_credentials().await, ProbeOutcome::Pass(_)),
        };
        if !valid {
            return ProbeOutcome::pass("not applicable: credentials invalid");
        }
        let args = self.cloud_args(&["ec2", "describe-instances", "--max-items", "1"]);
        match run_ok(self.host, self.cfg, &self.cfg.cloud.cli, &args).await {
            Ok(_) => ProbeOutcome::pass("instance listing allowed"),
            Err(e) => ProbeOutcome::fail(format!("listing call failed: {e}")),
        }
    }

    async fn credential_file(&self) -> ProbeOutcome {
        let path = &self.cfg.credentials.path;
        match self.host.file_mode(&PathBuf::from(path)).await {
            Ok(Some(_)) => ProbeOutcome::pass(format!("{path} present")),
            Ok(None) => ProbeOutcome::fail(format!("{path} missing")),
            Err(e) => ProbeOutcome::fail(format!("cannot stat {path}: {e:#}")),
        }
    }

    async fn credential_mode(&self) -> ProbeOutcome {
        let path = &self.cfg.credentials.path;
        let required = match self.cfg.credentials.required_mode() {
            Ok(m) => m,
            Err(e) => return ProbeOutcome::fail_fixed(e.to_string()),
        };
        match self.host.file_mode(&PathBuf::from(path)).await {
            Ok(Some(actual)) => classify_mode(path, actual, required),
            Ok(None) => ProbeOutcome::pass(format!("not applicable: {path} missing")),
            Err(e) => ProbeOutcome::fail_fixed(format!("cannot stat {path}: {e:#}")),
        }
    }

    async fn container_active(&mut self) -> bool {
        if let Some(active) = self.container_active {
            return active;
        }
        let active = matches!(
            self.host.active_state(&self.cfg.container.service).await,
            Ok(state) if state.trim() == "active"
        );
        self.container_active = Some(active);
        active
    }

    async fn container_daemon(&mut self) -> ProbeOutcome {
        if !self.container_active().await {
            return ProbeOutcome::pass(format!(
                "not applicable: {} inactive",
                self.cfg.container.service
            ));
        }
        let args = ["info", "--format", "{{.ServerVersion}}"];
        match run_ok(self.host, self.cfg, "docker", &args).await {
            Ok(version) => ProbeOutcome::pass(format!("daemon {}", version.trim())),
            Err(e) => ProbeOutcome::fail(format!("daemon query failed: {e}")),
        }
    }

    async fn runtime_packages(&self) -> ProbeOutcome {
        let packages = &self.cfg.runtime.packages;
        if packages.is_empty() {
            return ProbeOutcome::pass("no packages required");
        }
        let script = format!("import {}", packages.join(", "));
        match run_ok(self.host, self.cfg, &self.cfg.runtime.python, &["-c", &script]).await {
            Ok(_) => ProbeOutcome::pass(format!("{} packages importable", packages.len())),
            Err(e) => ProbeOutcome::fail(e),
        }
    }

    async fn remediate(
        &mut self,
        def: &CheckDefinition,
        kind: RemediationKind,
        result: CheckResult,
    ) -> CheckResult {
        let grace = self.cfg.timeouts.remediation_grace();
        match kind {
            RemediationKind::FixPermissions => {
                let Ok(mode) = self.cfg.credentials.required_mode() else {
                    return result;
                };
                let action = RemediationAction::FixPermissions {
                    path: PathBuf::from(&self.cfg.credentials.path),
                    mode,
                };
                match remediation::attempt(self.host, &action, grace).await {
                    Ok(note) => result.with_remediation(true, &note),
                    Err(e) => result.with_remediation(false, &e.to_string()),
                }
            }
            RemediationKind::StartService => {
                let action = RemediationAction::StartService {
                    unit: self.cfg.cache.service.clone(),
                };
                match remediation::attempt(self.host, &action, grace).await {
                    // One confirming ping against the same probe; no loop.
                    Ok(note) => match probe_cache(self.host, self.cfg).await {
                        ProbeOutcome::Pass(_) => result.with_remediation(true, &note),
                        ProbeOutcome::Fail { message, .. } => result.with_remediation(
                            false,
                            &format!("{} started but {message}", self.cfg.cache.service),
                        ),
                    },
                    Err(e) => {
                        tracing::debug!(check = def.name, error = %e, "remediation failed");
                        result.with_remediation(false, &e.to_string())
                    }
                }
            }
        }
    }
}

/// Ping the cache and expect `PONG`.
async fn probe_cache(host: &impl CommandRunner, cfg: &OpsConfig) -> ProbeOutcome {
    let port = cfg.cache.port.to_string();
    let args = ["-h", cfg.cache.host.as_str(), "-p", port.as_str(), "ping"];
    match run_ok(host, cfg, "redis-cli", &args).await {
        Ok(out) if out.trim() == "PONG" => ProbeOutcome::pass(format!("{}:{} PONG", cfg.cache.host, cfg.cache.port)),
        Ok(out) => ProbeOutcome::fail(format!("unexpected reply: {}", out.trim())),
        Err(e) => ProbeOutcome::fail(format!("ping failed: {e}")),
    }
}

fn threshold(label: &str, sampled: anyhow::Result<f64>, ceiling: f64) -> ProbeOutcome {
    match sampled {
        Ok(value) => classify_threshold(label, value, ceiling),
        Err(e) => ProbeOutcome::fail(format!("cannot sample {label}: {e:#}")),
    }
}

/// Run a command bounded by the configured timeout. `Ok(stdout)` only on a
/// zero exit; otherwise the most informative line of stderr.
async fn run_ok(
    host: &impl CommandRunner,
    cfg: &OpsConfig,
    program: &str,
    args: &[&str],
) -> Result<String, String> {
    let output = host
        .run_with_timeout(program, args, cfg.timeouts.command())
        .await
        .map_err(|e| format!("{e:#}"))?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(str::trim)
        .map(String::from);
    Err(line.unwrap_or_else(|| match output.status.code() {
        Some(code) => format!("{program} exited with {code}"),
        None => format!("{program} killed by signal"),
    }))
}
