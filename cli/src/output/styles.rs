//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

use crate::domain::check::CheckStatus;
use crate::domain::report::OverallStatus;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Info messages (blue)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Headers/section titles
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
    }

    #[must_use]
    pub fn for_check(&self, status: CheckStatus) -> Style {
        match status {
            CheckStatus::Ok => self.success,
            CheckStatus::Warning => self.warning,
            CheckStatus::Failure => self.error,
        }
    }

    #[must_use]
    pub fn for_overall(&self, status: OverallStatus) -> Style {
        match status {
            OverallStatus::Healthy => self.success,
            OverallStatus::Degraded => self.warning,
            OverallStatus::Unhealthy => self.error,
        }
    }
}
