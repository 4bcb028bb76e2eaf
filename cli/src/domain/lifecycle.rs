//! Lifecycle state machine and the persisted process handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::LifecycleError;

/// State of the managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Stopped => "STOPPED",
            LifecycleState::Starting => "STARTING",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Stopping => "STOPPING",
        }
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when `next` is not
    /// reachable from `self`.
    pub fn transition(self, next: LifecycleState) -> Result<LifecycleState, LifecycleError> {
        use LifecycleState as S;
        let allowed = matches!(
            (self, next),
            (S::Stopped, S::Starting)
                | (S::Starting, S::Running | S::Stopped)
                | (S::Running, S::Stopping)
                | (S::Stopping, S::Stopped)
        );
        if allowed {
            Ok(next)
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// Map the service manager's `ActiveState` property.
    #[must_use]
    pub fn from_active_state(active: &str) -> Option<LifecycleState> {
        match active.trim() {
            "active" | "reloading" => Some(LifecycleState::Running),
            "activating" => Some(LifecycleState::Starting),
            "deactivating" => Some(LifecycleState::Stopping),
            "inactive" | "failed" => Some(LifecycleState::Stopped),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record written by a direct launch so later stop/status calls address
/// exactly the process that was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHandle {
    pub pid: u32,
    pub port: u16,
    pub bind_address: String,
    pub started_at: DateTime<Utc>,
}

/// Seconds after launch during which a live PID is trusted before it has
/// bound its port.
pub const STARTUP_GRACE_SECS: i64 = 60;

impl ProcessHandle {
    /// Whether `now` is still inside the post-launch window.
    #[must_use]
    pub fn in_startup_window(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.started_at).num_seconds();
        (0..STARTUP_GRACE_SECS).contains(&elapsed)
    }
}

/// How `stop()` concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// Stopped through the service manager.
    ManagerStopped,
    /// Recorded process exited after the graceful signal.
    Terminated,
    /// Recorded process had to be force-killed.
    Killed,
    /// Nothing was running.
    AlreadyStopped,
}

/// How `start()` brought the service up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum StartOutcome {
    ServiceManager { unit: String },
    Direct { handle: ProcessHandle },
    /// The recorded process or active unit was already serving.
    AlreadyRunning {
        #[serde(skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },
}
