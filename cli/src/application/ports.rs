//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::lifecycle::ProcessHandle;
use crate::domain::metrics::LoadAverage;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Reporter that drops every event. Used for machine-readable output.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

// ── HTTP Ports ────────────────────────────────────────────────────────────────

/// Status line and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Plain GET against the managed application.
#[allow(async_fn_in_trait)]
pub trait HttpProbe {
    /// Fetch `url`. A non-2xx status is a response, not an error; only
    /// transport failures (refused, timeout) are errors.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Token-gated local metadata service.
#[allow(async_fn_in_trait)]
pub trait MetadataClient {
    /// Acquire a session token valid for `ttl_secs`.
    async fn acquire_token(&self, ttl_secs: u64) -> Result<String>;
    /// Fetch `meta-data/<path>`, with the token header when one is given.
    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<String>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Abstracts the few filesystem operations the services need.
#[allow(async_fn_in_trait)]
pub trait LocalFs {
    /// Permission bits of `path`, or `None` if it does not exist.
    async fn file_mode(&self, path: &Path) -> Result<Option<u32>>;
    /// Contents of `path`, or `None` if it does not exist.
    async fn read_optional(&self, path: &Path) -> Result<Option<String>>;
    /// Set the permission bits of an existing file.
    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
    /// Replace `path` atomically with `contents` at `mode`.
    async fn write_atomic(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()>;
}

// ── Metrics Port ──────────────────────────────────────────────────────────────

/// Host resource sampling. Each metric is sampled independently so one
/// unreadable counter does not hide the others.
#[allow(async_fn_in_trait)]
pub trait MetricsSampler {
    async fn cpu_percent(&self) -> Result<f64>;
    async fn memory_percent(&self) -> Result<f64>;
    async fn disk_percent(&self, mount: &str) -> Result<f64>;
    async fn load_average(&self) -> Result<LoadAverage>;
}

// ── Service Manager Port ──────────────────────────────────────────────────────

/// The host service manager.
#[allow(async_fn_in_trait)]
pub trait ServiceManager {
    /// `ActiveState` of `unit` (`active`, `inactive`, `activating`, ...).
    async fn active_state(&self, unit: &str) -> Result<String>;
    /// Whether `unit` is known to the service manager.
    async fn is_registered(&self, unit: &str) -> Result<bool>;
    async fn start_unit(&self, unit: &str) -> Result<()>;
    async fn stop_unit(&self, unit: &str) -> Result<()>;
}

// ── Process Control Port ──────────────────────────────────────────────────────

/// Termination signal sent to a managed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Kill,
}

impl Signal {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Signal::Terminate => "TERM",
            Signal::Kill => "KILL",
        }
    }
}

/// What to launch when no service manager unit is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub argv: Vec<String>,
    pub working_dir: String,
    pub env: Vec<(String, String)>,
    pub log_file: String,
}

/// Direct process control, addressed by PID only.
#[allow(async_fn_in_trait)]
pub trait ProcessControl {
    async fn is_alive(&self, pid: u32) -> Result<bool>;
    async fn signal(&self, pid: u32, signal: Signal) -> Result<()>;
    /// Spawn the process detached and return its PID.
    async fn launch(&self, spec: &LaunchSpec) -> Result<u32>;
    /// PIDs listening on TCP `port`.
    async fn listeners(&self, port: u16) -> Result<Vec<u32>>;
}

// ── Handle Store Port ─────────────────────────────────────────────────────────

/// Persistence of the process handle recorded by a direct launch.
#[allow(async_fn_in_trait)]
pub trait HandleStore {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>>;
    async fn save_handle(&self, handle: &ProcessHandle) -> Result<()>;
    async fn clear_handle(&self) -> Result<()>;
}

// ── Composite ─────────────────────────────────────────────────────────────────

/// Everything the health, lifecycle and provisioning services touch on the
/// host.
pub trait HostEnvironment:
    CommandRunner
    + HttpProbe
    + MetadataClient
    + LocalFs
    + MetricsSampler
    + ServiceManager
    + ProcessControl
    + HandleStore
{
}

/// Blanket implementation: any type implementing every sub-trait is a
/// `HostEnvironment`.
impl<T> HostEnvironment for T where
    T: CommandRunner
        + HttpProbe
        + MetadataClient
        + LocalFs
        + MetricsSampler
        + ServiceManager
        + ProcessControl
        + HandleStore
{
}
