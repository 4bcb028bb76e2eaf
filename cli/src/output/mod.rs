//! Terminal output: styling, rendering and progress.
//!
//! Everything here writes to stdout except diagnostics, which go through
//! `tracing` on stderr.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::{OwoColorize as _, Style};
pub use styles::Styles;

/// Styling and terminal state shared by every renderer.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Suppress everything but failures and machine output.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a TTY, and never with `--no-color` or
    /// `NO_COLOR` set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if is_tty && !no_color && std::env::var_os("NO_COLOR").is_none() {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn emit(&self, mark: &str, style: Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", mark.style(style));
        }
    }

    pub fn success(&self, msg: &str) {
        self.emit("✓", self.styles.success, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.emit("⚠", self.styles.warning, msg);
    }

    pub fn info(&self, msg: &str) {
        self.emit("ℹ", self.styles.info, msg);
    }

    /// Section title, preceded by a blank line unless it opens the output.
    pub fn section(&self, title: &str, first: bool) {
        if self.quiet {
            return;
        }
        if !first {
            println!();
        }
        println!("  {}", title.style(self.styles.header));
    }

    /// Aligned `key value` line with the key dimmed.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<18} {value}", key.style(self.styles.dim));
        }
    }

    /// Up/down line for a dependent service.
    pub fn dependency(&self, label: &str, up: bool) {
        if up {
            self.success(label);
        } else {
            self.emit("✗", self.styles.error, &format!("{label} unavailable"));
        }
    }
}
