//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::application::services::provision::ProvisionOutcome;
use crate::domain::check::{CheckResult, CheckStatus};
use crate::domain::lifecycle::{StartOutcome, StopOutcome};
use crate::domain::report::HealthReport;
use crate::domain::status::StatusSnapshot;
use crate::output::{OutputContext, Styles};

/// Status marker shown in front of each check line.
#[must_use]
pub fn marker(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Ok => "✓",
        CheckStatus::Warning => "⚠",
        CheckStatus::Failure => "✗",
    }
}

/// One line per check: marker, name, status word, message.
#[must_use]
pub fn check_line(styles: &Styles, result: &CheckResult) -> String {
    let style = styles.for_check(result.status);
    format!(
        "  {} {:<18} {:<8} {}",
        marker(result.status).style(style),
        result.check,
        result.status.as_str().style(style),
        result.message
    )
}

/// Final aggregate line of a health report.
#[must_use]
pub fn summary_line(styles: &Styles, report: &HealthReport) -> String {
    format!(
        "  {}  {} issue(s), {} warning(s)",
        report
            .overall_status
            .as_str()
            .style(styles.for_overall(report.overall_status)),
        report.issue_count,
        report.warning_count
    )
}

/// Renders domain types as human-readable terminal output using `OutputContext`.
/// First twelve hex digits of a digest.
#[must_use]
pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Check lines only. Failures are printed even when quiet.
    pub fn render_checks(&self, results: &[CheckResult]) {
        for result in results {
            if !self.ctx.quiet || result.status == CheckStatus::Failure {
                println!("{}", check_line(&self.ctx.styles, result));
            }
        }
    }

    pub fn render_report(&self, report: &HealthReport) {
        self.ctx.section("Health check", true);
        self.render_checks(&report.results);
        println!();
        println!("{}", summary_line(&self.ctx.styles, report));
    }

    pub fn render_status(&self, s: &StatusSnapshot) {
        if self.ctx.quiet {
            println!("{}", s.state);
            return;
        }
        self.ctx.section("Service", true);
        self.ctx.kv("State:", s.state.as_str());
        if let Some(active) = &s.manager_state {
            self.ctx.kv("Service manager:", active);
        }
        if let Some(h) = &s.handle {
            let alive = if s.process_alive { "alive" } else { "gone" };
            self.ctx.kv("Process:", &format!("pid {} ({alive})", h.pid));
            self.ctx.kv("Listening:", &format!("{}:{}", h.bind_address, h.port));
            self.ctx.kv("Started:", &h.started_at.to_rfc3339());
        }
        let api = if !s.api.reachable {
            "unreachable".to_string()
        } else {
            let status = s.api.status.as_deref().unwrap_or("no status");
            match &s.api.reported_at {
                Some(ts) => format!("{status} (reported {ts})"),
                None => status.to_string(),
            }
        };
        self.ctx.kv("API:", &api);

        self.ctx.section("Resources", false);
        match &s.resources {
            Some(r) => {
                self.ctx.kv("CPU:", &format!("{:.1}%", r.cpu));
                self.ctx.kv("Memory:", &format!("{:.1}%", r.memory));
                self.ctx.kv("Disk:", &format!("{:.1}%", r.disk));
            }
            None => self.ctx.warn("resource metrics unavailable"),
        }
        if let Some(l) = &s.load {
            self.ctx
                .kv("Load:", &format!("{:.2} {:.2} {:.2}", l.one, l.five, l.fifteen));
        }

        self.ctx.section("Dependencies", false);
        let d = &s.dependencies;
        for (label, up) in [
            ("container service", d.container_service_active),
            ("container daemon", d.container_daemon_reachable),
            ("cache", d.cache_reachable),
        ] {
            self.ctx.dependency(label, up);
        }
    }

    pub fn render_provision(&self, outcome: &ProvisionOutcome) {
        if outcome.dry_run {
            for artifact in &outcome.artifacts {
                println!("# {}", artifact.path.display());
                print!("{}", artifact.contents);
                println!();
            }
            return;
        }
        if self.ctx.quiet {
            return;
        }
        let id = &outcome.identity;
        self.ctx.kv("Instance:", &format!("{} ({})", id.instance_id, id.instance_type));
        self.ctx.kv("Region:", &format!("{} / {}", id.region, id.availability_zone));
        for artifact in &outcome.artifacts {
            println!(
                "  {} {}  {}",
                "✓".style(self.ctx.styles.success),
                artifact.path.display(),
                short_digest(&artifact.sha256).style(self.ctx.styles.dim)
            );
        }
    }

    pub fn render_start(&self, outcome: &StartOutcome) {
        match outcome {
            StartOutcome::ServiceManager { unit } => {
                self.ctx.success(&format!("{unit} started by the service manager"));
            }
            StartOutcome::Direct { handle } => self.ctx.success(&format!(
                "started pid {} on {}:{}",
                handle.pid, handle.bind_address, handle.port
            )),
            StartOutcome::AlreadyRunning { pid: Some(pid) } => {
                self.ctx.info(&format!("already running (pid {pid})"));
            }
            StartOutcome::AlreadyRunning { pid: None } => self.ctx.info("already running"),
        }
    }

    pub fn render_stop(&self, outcome: StopOutcome) {
        match outcome {
            StopOutcome::ManagerStopped => self.ctx.success("stopped by the service manager"),
            StopOutcome::Terminated => self.ctx.success("stopped"),
            StopOutcome::Killed => self.ctx.warn("stopped (forced after grace period)"),
            StopOutcome::AlreadyStopped => self.ctx.info("already stopped"),
        }
    }
}
