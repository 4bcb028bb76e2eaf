//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the loaded
//! configuration. Commands take `&AppContext` and nothing else.

use crate::domain::config::OpsConfig;
use crate::infra::LocalHost;
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Validated static configuration.
    pub config: OpsConfig,
    /// Host adapters every service runs against.
    pub host: LocalHost,
}

impl AppContext {
    #[must_use]
    pub fn new(flags: &OutputFlags, config: OpsConfig) -> Self {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            host: LocalHost::new(&config),
            config,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
}
