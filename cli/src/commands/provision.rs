//! `ndt-ops provision`: resolve identity and write the artifact set.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::SilentReporter;
use crate::application::services::provision::provision;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

#[derive(Args, Debug, Default)]
pub struct ProvisionArgs {
    /// Print the artifacts instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Run `ndt-ops provision`.
///
/// # Errors
///
/// Returns an error if an artifact cannot be written.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let outcome = if app.is_json() || args.dry_run {
        provision(&app.host, &app.config, args.dry_run, &SilentReporter).await?
    } else {
        provision(&app.host, &app.config, false, &TerminalReporter::new(&app.output)).await?
    };

    if app.is_json() {
        println!("{}", json::render(&outcome)?);
    } else {
        HumanRenderer::new(&app.output).render_provision(&outcome);
    }
    Ok(ExitCode::SUCCESS)
}
