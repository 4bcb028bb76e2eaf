//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::{AppContext, OutputFlags};
use crate::commands;
use crate::domain::error::{ConfigError, LifecycleError};
use crate::infra::config::YamlConfigStore;
use crate::output::json;

/// Provision, health-check and run the NDT manager service
#[derive(Parser)]
#[command(
    name = "ndt-ops",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file (default: /etc/ndt/ops.yaml, then ~/.ndt/ops.yaml)
    #[arg(long, global = true, env = "NDT_OPS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (any non-empty NO_COLOR value also disables it)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Verbose diagnostics on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve host identity and write the configuration artifacts
    Provision(commands::provision::ProvisionArgs),

    /// Check preconditions and start the managed service
    Start,

    /// Stop the managed service
    Stop,

    /// Show service state, resources and dependencies (read-only)
    Status,

    /// Run every dependency check, fixing what can be fixed
    #[command(alias = "health-check")]
    Health,
}

impl Cli {
    /// Initialise diagnostics on stderr. `RUST_LOG` wins over `-v`.
    pub fn init_tracing(&self) {
        let default = match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Execute the CLI command.
    ///
    /// In JSON mode failures are printed as the JSON error object and turned
    /// into exit code 1 here.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails in human mode.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            json,
            quiet,
            no_color,
            command,
            ..
        } = self;
        let config = match YamlConfigStore::new(config).load() {
            Ok(config) => config,
            Err(e) if json => return print_json_error(&e, "invalid_config"),
            Err(e) => return Err(e),
        };
        let app = AppContext::new(
            &OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        );
        let result = match command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Start => commands::start::run(&app).await,
            Command::Stop => commands::stop::run(&app).await,
            Command::Status => commands::status::run(&app).await,
            Command::Health => commands::health::run(&app).await,
        };
        match result {
            Err(e) if json => print_json_error(&e, error_code(&e)),
            other => other,
        }
    }
}

fn print_json_error(err: &anyhow::Error, code: &str) -> Result<ExitCode> {
    println!("{}", json::format_error(&format!("{err:#}"), code)?);
    Ok(ExitCode::from(1))
}

/// Stable machine-readable code for a command failure.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ConfigError>().is_some() {
        return "invalid_config";
    }
    match err.downcast_ref::<LifecycleError>() {
        Some(LifecycleError::PreconditionFailed { .. }) => "precondition_failed",
        Some(LifecycleError::LaunchFailed(_)) => "launch_failed",
        Some(LifecycleError::StopFailed(_)) => "stop_failed",
        Some(LifecycleError::InvalidTransition { .. }) => "invalid_transition",
        None => "command_failed",
    }
}
