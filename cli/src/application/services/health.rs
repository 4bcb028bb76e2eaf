//! Application service: health-check use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use chrono::Utc;

use crate::application::ports::{HostEnvironment, ProgressReporter};
use crate::application::services::checks::run_checks;
use crate::domain::check::CheckId;
use crate::domain::config::OpsConfig;
use crate::domain::report::{HealthReport, score};

/// Run the full registry with remediation enabled and score the results.
pub async fn health_check(
    host: &impl HostEnvironment,
    cfg: &OpsConfig,
    reporter: &impl ProgressReporter,
) -> HealthReport {
    let results = run_checks(host, cfg, &CheckId::ALL, true, reporter).await;
    let report = score(results, Utc::now());
    tracing::info!(
        overall = report.overall_status.as_str(),
        issues = report.issue_count,
        warnings = report.warning_count,
        "health check complete"
    );
    report
}
