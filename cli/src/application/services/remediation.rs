//! Application service: bounded, single-attempt corrective actions.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{LocalFs, ServiceManager};
use crate::domain::error::RemediationError;

/// The only two things remediation is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationAction {
    /// Reset one file's permission bits.
    FixPermissions { path: PathBuf, mode: u32 },
    /// Ask the service manager to start one dependent service.
    StartService { unit: String },
}

/// Run `action` once. On success returns a short note for the check message.
///
/// `StartService` waits `grace` after the start request and then requires the
/// unit to report `active`.
///
/// # Errors
///
/// Returns a [`RemediationError`] describing why the action did not take.
pub async fn attempt(
    host: &(impl LocalFs + ServiceManager),
    action: &RemediationAction,
    grace: Duration,
) -> Result<String, RemediationError> {
    match action {
        RemediationAction::FixPermissions { path, mode } => {
            host.set_mode(path, *mode)
                .await
                .map_err(|e| RemediationError::Permission {
                    path: path.display().to_string(),
                    mode: *mode,
                    reason: format!("{e:#}"),
                })?;
            match host.file_mode(path).await {
                Ok(Some(actual)) if actual & 0o7777 == *mode => Ok(format!("mode set to {mode:o}")),
                Ok(Some(actual)) => Err(RemediationError::Permission {
                    path: path.display().to_string(),
                    mode: *mode,
                    reason: format!("mode is still {:o}", actual & 0o7777),
                }),
                Ok(None) => Err(RemediationError::Permission {
                    path: path.display().to_string(),
                    mode: *mode,
                    reason: "file disappeared".to_string(),
                }),
                Err(e) => Err(RemediationError::Permission {
                    path: path.display().to_string(),
                    mode: *mode,
                    reason: format!("{e:#}"),
                }),
            }
        }
        RemediationAction::StartService { unit } => {
            host.start_unit(unit)
                .await
                .map_err(|e| RemediationError::ServiceStart {
                    service: unit.clone(),
                    reason: format!("{e:#}"),
                })?;
            tokio::time::sleep(grace).await;
            match host.active_state(unit).await {
                Ok(state) if state.trim() == "active" => Ok(format!("started {unit}")),
                _ => Err(RemediationError::Unconfirmed {
                    service: unit.clone(),
                }),
            }
        }
    }
}

/// Run `action` once and report only whether it worked.
///
/// Bool-only wrapper over [`attempt`] that logs the outcome. The check runner
/// calls [`attempt`] directly because it folds the note or the error into the
/// check message.
pub async fn execute(
    host: &(impl LocalFs + ServiceManager),
    action: &RemediationAction,
    grace: Duration,
) -> bool {
    match attempt(host, action, grace).await {
        Ok(note) => {
            tracing::info!(?action, note = %note, "remediation succeeded");
            true
        }
        Err(e) => {
            tracing::warn!(?action, error = %e, "remediation failed");
            false
        }
    }
}
