//! `ndt-ops status`: read-only view of the managed service.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle;
use crate::output::human::HumanRenderer;
use crate::output::json;

/// Run `ndt-ops status`. Always exits 0; the state is in the output.
///
/// # Errors
///
/// Returns an error only if the snapshot cannot be serialized.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let snapshot = lifecycle::status(&app.host, &app.config).await;
    if app.is_json() {
        println!("{}", json::render(&snapshot)?);
    } else {
        HumanRenderer::new(&app.output).render_status(&snapshot);
    }
    Ok(ExitCode::SUCCESS)
}
