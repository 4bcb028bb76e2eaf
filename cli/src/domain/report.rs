//! Aggregate scoring of a check run.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::check::{CheckResult, CheckStatus};

/// Overall verdict of a health-check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    /// Warnings are advisory: only `Unhealthy` blocks automation.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            OverallStatus::Healthy | OverallStatus::Degraded => 0,
            OverallStatus::Unhealthy => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Healthy => "HEALTHY",
            OverallStatus::Degraded => "DEGRADED",
            OverallStatus::Unhealthy => "UNHEALTHY",
        }
    }
}

/// Scored result of one health-check invocation.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<CheckResult>,
    pub issue_count: usize,
    pub warning_count: usize,
    pub overall_status: OverallStatus,
}

impl HealthReport {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.overall_status.exit_code())
    }
}

/// Derive the overall status from the two counts.
#[must_use]
pub fn overall_status(issue_count: usize, warning_count: usize) -> OverallStatus {
    match (issue_count, warning_count) {
        (0, 0) => OverallStatus::Healthy,
        (0, _) => OverallStatus::Degraded,
        _ => OverallStatus::Unhealthy,
    }
}

/// Reduce a run's results to a report stamped with `timestamp`.
#[must_use]
pub fn score(results: Vec<CheckResult>, timestamp: DateTime<Utc>) -> HealthReport {
    let issue_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Failure)
        .count();
    let warning_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warning)
        .count();
    HealthReport {
        timestamp,
        overall_status: overall_status(issue_count, warning_count),
        results,
        issue_count,
        warning_count,
    }
}
