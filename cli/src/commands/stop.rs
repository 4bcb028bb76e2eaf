//! `ndt-ops stop`: stop the managed service. Idempotent.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::SilentReporter;
use crate::application::services::lifecycle;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

/// Run `ndt-ops stop`.
///
/// # Errors
///
/// Returns an error if the service manager refuses the stop or the process
/// survives a forced kill.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let outcome = if app.is_json() {
        lifecycle::stop(&app.host, &app.config, &SilentReporter).await?
    } else {
        lifecycle::stop(&app.host, &app.config, &TerminalReporter::new(&app.output)).await?
    };

    if app.is_json() {
        println!("{}", json::render(&serde_json::json!({ "outcome": outcome }))?);
    } else {
        HumanRenderer::new(&app.output).render_stop(outcome);
    }
    Ok(ExitCode::SUCCESS)
}
