//! `ndt-ops start`: gate on preconditions, then launch the managed service.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use crate::app::AppContext;
use crate::application::ports::SilentReporter;
use crate::application::services::lifecycle::{self, StartAttempt};
use crate::domain::check::CheckResult;
use crate::domain::lifecycle::StartOutcome;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

#[derive(Serialize)]
struct StartJson<'a> {
    preconditions: &'a [CheckResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a StartOutcome>,
}

/// Run `ndt-ops start`.
///
/// # Errors
///
/// Returns the failing precondition as an error (exit 1) after rendering the
/// precondition results, or any launch error.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let attempt = if app.is_json() {
        lifecycle::start(&app.host, &app.config, &SilentReporter).await?
    } else {
        lifecycle::start(&app.host, &app.config, &TerminalReporter::new(&app.output)).await?
    };

    let renderer = HumanRenderer::new(&app.output);
    match attempt {
        StartAttempt::Started {
            preconditions,
            outcome,
        } => {
            if app.is_json() {
                let doc = StartJson {
                    preconditions: &preconditions,
                    outcome: Some(&outcome),
                };
                println!("{}", json::render(&doc)?);
            } else {
                renderer.render_checks(&preconditions);
                renderer.render_start(&outcome);
            }
            Ok(ExitCode::SUCCESS)
        }
        StartAttempt::Blocked {
            preconditions,
            error,
        } => {
            if !app.is_json() {
                renderer.render_checks(&preconditions);
            }
            Err(error.into())
        }
    }
}
