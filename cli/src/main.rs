//! ndt-ops: provisioning, health checks and lifecycle for the NDT manager

use std::process::ExitCode;

use clap::Parser;

use ndt_ops::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.init_tracing();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}
