//! Read-only status snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::lifecycle::{LifecycleState, ProcessHandle};
use crate::domain::metrics::{LoadAverage, ResourceSample};

/// Liveness observation of the managed application's HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiObservation {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Timestamp reported in the liveness payload, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<String>,
}

impl ApiObservation {
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            status: None,
            reported_at: None,
        }
    }

    /// Extract `status` and `timestamp` from a liveness body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let value = serde_json::from_str::<serde_json::Value>(body).ok();
        let field = |name: &str| {
            value
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(serde_json::Value::as_str)
                .map(String::from)
        };
        Self {
            reachable: true,
            status: field("status"),
            reported_at: field("timestamp"),
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.reachable && self.status.as_deref() == Some("healthy")
    }
}

/// Reachability of the services the managed application depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyObservation {
    pub container_service_active: bool,
    pub container_daemon_reachable: bool,
    pub cache_reachable: bool,
}

/// Composite, side-effect-free view returned by `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub state: LifecycleState,
    /// Raw `ActiveState` when the unit is registered with the service manager.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<ProcessHandle>,
    pub process_alive: bool,
    pub api: ApiObservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadAverage>,
    pub dependencies: DependencyObservation,
}

/// Derive the lifecycle state from what was observed.
///
/// The service manager's view wins when the unit is registered; otherwise a
/// live recorded process or a reachable API counts as running.
#[must_use]
pub fn derive_state(manager_state: Option<&str>, process_alive: bool, api_reachable: bool) -> LifecycleState {
    if let Some(state) = manager_state.and_then(LifecycleState::from_active_state) {
        return state;
    }
    if process_alive || api_reachable {
        LifecycleState::Running
    } else {
        LifecycleState::Stopped
    }
}
