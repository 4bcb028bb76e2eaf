//! Service-manager access through `systemctl`.

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;

async fn show(runner: &impl CommandRunner, unit: &str, property: &str) -> Result<String> {
    let out = runner
        .run("systemctl", &["show", "-p", property, "--value", unit])
        .await
        .with_context(|| format!("querying {property} of {unit}"))?;
    anyhow::ensure!(
        out.status.success(),
        "systemctl show {unit}: {}",
        String::from_utf8_lossy(&out.stderr).trim()
    );
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

pub async fn active_state(runner: &impl CommandRunner, unit: &str) -> Result<String> {
    show(runner, unit, "ActiveState").await
}

/// A unit counts as registered when systemd has loaded its unit file. A host
/// without a usable `systemctl` has no registered units.
pub async fn is_registered(runner: &impl CommandRunner, unit: &str) -> Result<bool> {
    match show(runner, unit, "LoadState").await {
        Ok(state) => Ok(state == "loaded"),
        Err(e) => {
            tracing::debug!(unit, error = %e, "service manager unavailable");
            Ok(false)
        }
    }
}

async fn control(runner: &impl CommandRunner, verb: &str, unit: &str) -> Result<()> {
    let out = runner
        .run("systemctl", &[verb, unit])
        .await
        .with_context(|| format!("systemctl {verb} {unit}"))?;
    if out.status.success() {
        tracing::info!(unit, verb, "systemctl ok");
        return Ok(());
    }
    anyhow::bail!(
        "systemctl {verb} {unit} failed: {}",
        String::from_utf8_lossy(&out.stderr).trim()
    )
}

pub async fn start_unit(runner: &impl CommandRunner, unit: &str) -> Result<()> {
    control(runner, "start", unit).await
}

pub async fn stop_unit(runner: &impl CommandRunner, unit: &str) -> Result<()> {
    control(runner, "stop", unit).await
}
