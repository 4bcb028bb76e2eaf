//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! On a TTY, steps drive a single indicatif spinner that is replaced by the
//! next success or warning line. Elsewhere steps print as plain lines, or not
//! at all for transient reporters.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    /// Print steps as lines when there is no spinner.
    echo_steps: bool,
    spinner: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            echo_steps: true,
            spinner: RefCell::new(None),
        }
    }

    /// Steps only ever show as a spinner; nothing is printed off-TTY.
    #[must_use]
    pub fn transient(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            echo_steps: false,
            spinner: RefCell::new(None),
        }
    }

    /// Remove any spinner left on screen.
    pub fn finish(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.show_progress() {
            let mut slot = self.spinner.borrow_mut();
            match slot.as_ref() {
                Some(pb) => pb.set_message(message.to_string()),
                None => *slot = Some(progress::spinner(message)),
            }
        } else if self.echo_steps && !self.ctx.quiet {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        self.finish();
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        self.finish();
        self.ctx.warn(message);
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
