//! Application service: managed service start, stop and status.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::application::ports::{
    HostEnvironment, LaunchSpec, ProcessControl, ProgressReporter, Signal, SilentReporter,
};
use crate::application::services::checks::{liveness_url, run_checks};
use crate::domain::artifacts::{ENV_FILE_NAME, parse_env_file, server_argv};
use crate::domain::check::{CheckId, CheckResult, CheckStatus};
use crate::domain::config::OpsConfig;
use crate::domain::error::LifecycleError;
use crate::domain::lifecycle::{LifecycleState, ProcessHandle, StartOutcome, StopOutcome};
use crate::domain::metrics::ResourceSample;
use crate::domain::status::{
    ApiObservation, DependencyObservation, StatusSnapshot, derive_state,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Whether the recorded process is still the one that was launched.
///
/// PIDs are reused, so a live PID alone is not enough: it must also hold the
/// recorded port, unless it was launched moments ago and may not have bound
/// yet. When listeners cannot be enumerated, liveness is all there is.
pub async fn handle_is_live(host: &impl ProcessControl, handle: &ProcessHandle) -> bool {
    if !host.is_alive(handle.pid).await.unwrap_or(false) {
        return false;
    }
    if handle.in_startup_window(Utc::now()) {
        return true;
    }
    match host.listeners(handle.port).await {
        Ok(pids) if pids.contains(&handle.pid) => true,
        Ok(pids) => {
            tracing::warn!(
                pid = handle.pid,
                port = handle.port,
                ?pids,
                "recorded pid is alive but does not hold its port, treating handle as stale"
            );
            false
        }
        Err(e) => {
            tracing::debug!(pid = handle.pid, error = %e, "cannot list port listeners");
            true
        }
    }
}

/// Result of a `start` call: the precondition results are always returned so
/// the caller can render them, whether or not the launch went ahead.
#[derive(Debug)]
pub enum StartAttempt {
    Started {
        preconditions: Vec<CheckResult>,
        outcome: StartOutcome,
    },
    Blocked {
        preconditions: Vec<CheckResult>,
        error: LifecycleError,
    },
}

/// Start the managed service, gated by the precondition checks.
///
/// # Errors
///
/// Returns an error if the launch itself fails after the preconditions pass.
pub async fn start(
    host: &impl HostEnvironment,
    cfg: &OpsConfig,
    reporter: &impl ProgressReporter,
) -> Result<StartAttempt> {
    let state = LifecycleState::Stopped.transition(LifecycleState::Starting)?;

    reporter.step("checking preconditions...");
    let preconditions = run_checks(host, cfg, &CheckId::PRECONDITIONS, false, reporter).await;
    if let Some(failed) = preconditions
        .iter()
        .find(|r| r.status == CheckStatus::Failure)
    {
        let state = state.transition(LifecycleState::Stopped)?;
        tracing::warn!(check = failed.check, %state, "start aborted by precondition");
        let error = LifecycleError::PreconditionFailed {
            check: failed.check.to_string(),
            message: failed.message.clone(),
        };
        return Ok(StartAttempt::Blocked {
            preconditions,
            error,
        });
    }
    reporter.success("preconditions passed");

    let unit = &cfg.service.name;
    let registered = host
        .is_registered(unit)
        .await
        .context("querying service manager")?;

    if registered
        && let Ok(active) = host.active_state(unit).await
        && active.trim() == "active"
    {
        state.transition(LifecycleState::Running)?;
        return Ok(StartAttempt::Started {
            preconditions,
            outcome: StartOutcome::AlreadyRunning { pid: None },
        });
    }

    let recorded = host.load_handle().await.context("reading process handle")?;
    if let Some(handle) = &recorded
        && handle_is_live(host, handle).await
    {
        state.transition(LifecycleState::Running)?;
        return Ok(StartAttempt::Started {
            preconditions,
            outcome: StartOutcome::AlreadyRunning {
                pid: Some(handle.pid),
            },
        });
    }
    if recorded.is_some() {
        host.clear_handle().await.context("clearing stale process handle")?;
    }

    reclaim_port(host, cfg, reporter).await?;

    let outcome = if registered {
        reporter.step(&format!("starting {unit} via service manager..."));
        host.start_unit(unit)
            .await
            .map_err(|e| LifecycleError::LaunchFailed(format!("{e:#}")))?;
        StartOutcome::ServiceManager { unit: unit.clone() }
    } else {
        reporter.step(&format!("launching {unit} on port {}...", cfg.api.port));
        let handle = launch_direct(host, cfg).await?;
        StartOutcome::Direct { handle }
    };

    let state = state.transition(LifecycleState::Running)?;
    tracing::info!(%state, ?outcome, "managed service started");
    reporter.success(&format!("{unit} running"));
    Ok(StartAttempt::Started {
        preconditions,
        outcome,
    })
}

/// Terminate whatever still listens on the API port.
async fn reclaim_port(
    host: &impl HostEnvironment,
    cfg: &OpsConfig,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    let pids = match host.listeners(cfg.api.port).await {
        Ok(pids) => pids,
        Err(e) => {
            tracing::debug!(error = %e, port = cfg.api.port, "cannot list port listeners");
            Vec::new()
        }
    };
    if pids.is_empty() {
        return Ok(());
    }
    reporter.warn(&format!(
        "port {} held by stale process(es) {pids:?}, terminating",
        cfg.api.port
    ));
    terminate(host, &pids, cfg.timeouts.stop_grace()).await?;
    Ok(())
}

async fn launch_direct(host: &impl HostEnvironment, cfg: &OpsConfig) -> Result<ProcessHandle> {
    let env_path = PathBuf::from(&cfg.service.artifact_dir).join(ENV_FILE_NAME);
    let env = host
        .read_optional(&env_path)
        .await
        .with_context(|| format!("reading {}", env_path.display()))?
        .map(|text| parse_env_file(&text))
        .unwrap_or_default();

    let spec = LaunchSpec {
        argv: server_argv(cfg),
        working_dir: cfg.service.install_dir.clone(),
        env,
        log_file: format!("{}/{}.log", cfg.service.log_dir, cfg.service.name),
    };
    let pid = host
        .launch(&spec)
        .await
        .map_err(|e| LifecycleError::LaunchFailed(format!("{e:#}")))?;
    let handle = ProcessHandle {
        pid,
        port: cfg.api.port,
        bind_address: cfg.api.bind_host.clone(),
        started_at: Utc::now(),
    };
    host.save_handle(&handle)
        .await
        .context("recording process handle")?;
    Ok(handle)
}

/// Graceful signal, bounded wait, then force-kill survivors. Returns true if
/// anything had to be killed.
async fn terminate(host: &impl ProcessControl, pids: &[u32], grace: Duration) -> Result<bool> {
    for pid in pids {
        if let Err(e) = host.signal(*pid, Signal::Terminate).await {
            tracing::debug!(pid, error = %e, "TERM failed");
        }
    }
    let deadline = tokio::time::Instant::now() + grace;
    let mut survivors = alive(host, pids).await;
    while !survivors.is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL_INTERVAL).await;
        survivors = alive(host, &survivors).await;
    }
    if survivors.is_empty() {
        return Ok(false);
    }
    for pid in &survivors {
        tracing::warn!(pid, "grace period elapsed, sending KILL");
        host.signal(*pid, Signal::Kill)
            .await
            .map_err(|e| LifecycleError::StopFailed(format!("pid {pid}: {e:#}")))?;
    }
    Ok(true)
}

async fn alive(host: &impl ProcessControl, pids: &[u32]) -> Vec<u32> {
    let mut out = Vec::new();
    for pid in pids {
        if host.is_alive(*pid).await.unwrap_or(false) {
            out.push(*pid);
        }
    }
    out
}

/// Stop the managed service. Stopping a stopped service is a no-op.
///
/// # Errors
///
/// Returns an error if the service manager refuses the stop or a survivor
/// cannot be killed.
pub async fn stop(
    host: &impl HostEnvironment,
    cfg: &OpsConfig,
    reporter: &impl ProgressReporter,
) -> Result<StopOutcome> {
    let unit = &cfg.service.name;
    if host
        .is_registered(unit)
        .await
        .context("querying service manager")?
    {
        let current = host.active_state(unit).await.unwrap_or_default();
        if matches!(
            LifecycleState::from_active_state(&current),
            Some(LifecycleState::Stopped)
        ) {
            return Ok(StopOutcome::AlreadyStopped);
        }
        let state = LifecycleState::Running.transition(LifecycleState::Stopping)?;
        reporter.step(&format!("stopping {unit} via service manager..."));
        host.stop_unit(unit)
            .await
            .map_err(|e| LifecycleError::StopFailed(format!("{e:#}")))?;
        host.clear_handle().await.context("clearing process handle")?;
        state.transition(LifecycleState::Stopped)?;
        reporter.success(&format!("{unit} stopped"));
        return Ok(StopOutcome::ManagerStopped);
    }

    let Some(handle) = host.load_handle().await.context("reading process handle")? else {
        return Ok(StopOutcome::AlreadyStopped);
    };
    if !handle_is_live(host, &handle).await {
        host.clear_handle().await.context("clearing stale process handle")?;
        return Ok(StopOutcome::AlreadyStopped);
    }

    let state = LifecycleState::Running.transition(LifecycleState::Stopping)?;
    reporter.step(&format!("stopping pid {}...", handle.pid));
    let killed = terminate(host, &[handle.pid], cfg.timeouts.stop_grace()).await?;
    host.clear_handle().await.context("clearing process handle")?;
    state.transition(LifecycleState::Stopped)?;
    reporter.success(&format!("{unit} stopped"));
    Ok(if killed {
        StopOutcome::Killed
    } else {
        StopOutcome::Terminated
    })
}

/// Read-only composite view. Never remediates.
pub async fn status(host: &impl HostEnvironment, cfg: &OpsConfig) -> StatusSnapshot {
    let unit = &cfg.service.name;
    let manager_state = match host.is_registered(unit).await {
        Ok(true) => host
            .active_state(unit)
            .await
            .ok()
            .map(|s| s.trim().to_string()),
        _ => None,
    };
    let handle = host.load_handle().await.ok().flatten();
    let process_alive = match &handle {
        Some(h) => handle_is_live(host, h).await,
        None => false,
    };
    let api = match host.get(&liveness_url(cfg)).await {
        Ok(resp) => ApiObservation::from_body(&resp.body),
        Err(_) => ApiObservation::unreachable(),
    };

    let resources = match (
        host.cpu_percent().await,
        host.memory_percent().await,
        host.disk_percent(&cfg.thresholds.disk_mount).await,
    ) {
        (Ok(cpu), Ok(memory), Ok(disk)) => Some(ResourceSample { cpu, memory, disk }),
        _ => None,
    };
    let load = host.load_average().await.ok();

    let deps = run_checks(
        host,
        cfg,
        &[CheckId::ContainerService, CheckId::ContainerDaemon, CheckId::Cache],
        false,
        &SilentReporter,
    )
    .await;
    let ok = |i: usize| deps.get(i).is_some_and(|r| r.status == CheckStatus::Ok);

    StatusSnapshot {
        timestamp: Utc::now(),
        state: derive_state(manager_state.as_deref(), process_alive, api.reachable),
        manager_state,
        handle,
        process_alive,
        api,
        resources,
        load,
        dependencies: DependencyObservation {
            container_service_active: ok(0),
            // Reports OK as not applicable when the service is down.
            container_daemon_reachable: ok(0) && ok(1),
            cache_reachable: ok(2),
        },
    }
}
