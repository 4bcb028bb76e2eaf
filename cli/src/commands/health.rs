//! `ndt-ops health`: full dependency check with auto-remediation.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::SilentReporter;
use crate::application::services::health::health_check;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

/// Run `ndt-ops health`.
///
/// Exits 0 for HEALTHY and DEGRADED, 1 for UNHEALTHY.
///
/// # Errors
///
/// Returns an error only if the report cannot be serialized.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let report = if app.is_json() {
        health_check(&app.host, &app.config, &SilentReporter).await
    } else {
        let reporter = TerminalReporter::transient(&app.output);
        let report = health_check(&app.host, &app.config, &reporter).await;
        reporter.finish();
        report
    };

    if app.is_json() {
        println!("{}", json::render(&report)?);
    } else {
        HumanRenderer::new(&app.output).render_report(&report);
    }
    Ok(report.exit_code())
}
