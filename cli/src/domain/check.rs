//! Dependency check definitions, results, and pure classifiers.
//!
//! The registry is static: every [`CheckId`] carries its display order,
//! failure severity, and optional remediation. Probing itself lives in the
//! application layer; this module only decides what a probe's raw
//! observation means.

use serde::{Deserialize, Serialize};

// ── Status and severity ───────────────────────────────────────────────────────

/// Tri-state outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Warning,
    Failure,
}

impl CheckStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warning => "WARNING",
            CheckStatus::Failure => "FAILURE",
        }
    }
}

/// Status a check reports when its probe fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Failure,
    Warning,
}

impl From<Severity> for CheckStatus {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Failure => CheckStatus::Failure,
            Severity::Warning => CheckStatus::Warning,
        }
    }
}

/// Corrective action a check may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationKind {
    /// Reset the credential file's permission bits.
    FixPermissions,
    /// Ask the service manager to start the cache service.
    StartService,
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Every check the registry knows, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckId {
    ManagedProcess,
    ApiLiveness,
    ApiPayload,
    CloudCredentials,
    CloudPermissions,
    CredentialFile,
    CredentialMode,
    Cache,
    ContainerService,
    ContainerDaemon,
    RuntimePackages,
    CpuThreshold,
    MemoryThreshold,
    DiskThreshold,
}

impl CheckId {
    /// Full registry in its fixed order.
    pub const ALL: [CheckId; 14] = [
        CheckId::ManagedProcess,
        CheckId::ApiLiveness,
        CheckId::ApiPayload,
        CheckId::CloudCredentials,
        CheckId::CloudPermissions,
        CheckId::CredentialFile,
        CheckId::CredentialMode,
        CheckId::Cache,
        CheckId::ContainerService,
        CheckId::ContainerDaemon,
        CheckId::RuntimePackages,
        CheckId::CpuThreshold,
        CheckId::MemoryThreshold,
        CheckId::DiskThreshold,
    ];

    /// Subset that gates `start`.
    pub const PRECONDITIONS: [CheckId; 3] = [
        CheckId::CloudCredentials,
        CheckId::Cache,
        CheckId::ContainerService,
    ];

    #[must_use]
    pub fn definition(self) -> CheckDefinition {
        use CheckId as C;
        use RemediationKind as R;
        use Severity as S;
        let (name, severity, remediation) = match self {
            C::ManagedProcess => ("managed-process", S::Failure, None),
            C::ApiLiveness => ("api-liveness", S::Failure, None),
            C::ApiPayload => ("api-payload", S::Warning, None),
            C::CloudCredentials => ("cloud-credentials", S::Failure, None),
            C::CloudPermissions => ("cloud-permissions", S::Failure, None),
            C::CredentialFile => ("credential-file", S::Failure, None),
            C::CredentialMode => ("credential-mode", S::Warning, Some(R::FixPermissions)),
            C::Cache => ("cache", S::Failure, Some(R::StartService)),
            C::ContainerService => ("container-service", S::Failure, None),
            C::ContainerDaemon => ("container-daemon", S::Warning, None),
            C::RuntimePackages => ("runtime-packages", S::Failure, None),
            C::CpuThreshold => ("cpu", S::Warning, None),
            C::MemoryThreshold => ("memory", S::Warning, None),
            C::DiskThreshold => ("disk", S::Warning, None),
        };
        let order = Self::ALL.iter().position(|c| *c == self).unwrap_or(0) + 1;
        CheckDefinition {
            id: self,
            name,
            order,
            severity,
            remediation,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

/// Static description of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDefinition {
    pub id: CheckId,
    pub name: &'static str,
    /// 1-based display position.
    pub order: usize,
    pub severity: Severity,
    pub remediation: Option<RemediationKind>,
}

// ── Probe outcome and result ──────────────────────────────────────────────────

/// Raw outcome of a probe before severity is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Pass(String),
    /// Probe failed. `remediable` is false when the check's remediation
    /// cannot apply to this particular failure (e.g. the file is missing).
    Fail { message: String, remediable: bool },
}

impl ProbeOutcome {
    #[must_use]
    pub fn pass(message: impl Into<String>) -> Self {
        Self::Pass(message.into())
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            remediable: true,
        }
    }

    #[must_use]
    pub fn fail_fixed(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
            remediable: false,
        }
    }
}

/// Result of one check in one run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub check: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub remediation_attempted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_succeeded: Option<bool>,
}

impl CheckResult {
    /// Apply a definition's severity to a probe outcome, without remediation.
    #[must_use]
    pub fn from_outcome(def: &CheckDefinition, outcome: ProbeOutcome) -> Self {
        let (status, message) = match outcome {
            ProbeOutcome::Pass(m) => (CheckStatus::Ok, m),
            ProbeOutcome::Fail { message, .. } => (def.severity.into(), message),
        };
        Self {
            check: def.name,
            status,
            message,
            remediation_attempted: false,
            remediation_succeeded: None,
        }
    }

    /// Fold a remediation attempt into the result.
    ///
    /// A fixed FAILURE drops to WARNING: the dependency was absent when the
    /// run started. An unsuccessful fix keeps the probed status.
    #[must_use]
    pub fn with_remediation(mut self, succeeded: bool, note: &str) -> Self {
        self.remediation_attempted = true;
        self.remediation_succeeded = Some(succeeded);
        if succeeded && self.status == CheckStatus::Failure {
            self.status = CheckStatus::Warning;
        }
        let verdict = if succeeded { "fixed" } else { "fix failed" };
        self.message = format!("{} ({verdict}: {note})", self.message);
        self
    }
}

// ── Classifiers ───────────────────────────────────────────────────────────────

/// Compare a sampled percentage with its ceiling. Exceeding is never worse
/// than a warning.
#[must_use]
pub fn classify_threshold(label: &str, value: f64, ceiling: f64) -> ProbeOutcome {
    if value > ceiling {
        ProbeOutcome::fail(format!("{label} at {value:.1}% (ceiling {ceiling:.0}%)"))
    } else {
        ProbeOutcome::pass(format!("{label} at {value:.1}%"))
    }
}

/// Classify the managed application's liveness payload.
#[must_use]
pub fn classify_health_payload(body: &str) -> ProbeOutcome {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return ProbeOutcome::fail("health payload is not JSON");
    };
    match value.get("status").and_then(serde_json::Value::as_str) {
        Some("healthy") => ProbeOutcome::pass("status: healthy"),
        Some(other) => ProbeOutcome::fail(format!("status: {other}")),
        None => ProbeOutcome::fail("health payload has no status field"),
    }
}

/// Compare observed permission bits with the required mode.
#[must_use]
pub fn classify_mode(path: &str, actual: u32, required: u32) -> ProbeOutcome {
    let actual = actual & 0o7777;
    if actual == required {
        ProbeOutcome::pass(format!("{path} mode {actual:o}"))
    } else {
        ProbeOutcome::fail(format!("{path} mode {actual:o}, expected {required:o}"))
    }
}
