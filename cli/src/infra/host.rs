//! `LocalHost`: the production `HostEnvironment`.
//!
//! Composes the individual infrastructure adapters behind one value so the
//! services can take a single `&impl HostEnvironment`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{
    CommandRunner, HandleStore, HttpProbe, HttpResponse, LaunchSpec, LocalFs, MetadataClient,
    MetricsSampler, ProcessControl, ServiceManager, Signal,
};
use crate::domain::config::OpsConfig;
use crate::domain::lifecycle::ProcessHandle;
use crate::domain::metrics::LoadAverage;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::HostFs;
use crate::infra::http::UreqHttp;
use crate::infra::state::HandleFile;
use crate::infra::{metrics, process, systemd};

pub struct LocalHost {
    runner: TokioCommandRunner,
    http: UreqHttp,
    fs: HostFs,
    handles: HandleFile,
    proc_root: PathBuf,
}

impl LocalHost {
    /// Build the host adapters from the timeouts and paths in `cfg`.
    #[must_use]
    pub fn new(cfg: &OpsConfig) -> Self {
        Self {
            runner: TokioCommandRunner::new(cfg.timeouts.command()),
            http: UreqHttp::new(
                cfg.timeouts.http(),
                &cfg.metadata.endpoint,
                cfg.metadata.timeout(),
            ),
            fs: HostFs,
            handles: HandleFile::in_dir(Path::new(&cfg.service.run_dir)),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl CommandRunner for LocalHost {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.runner.run(program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        self.runner.run_with_timeout(program, args, timeout).await
    }
}

impl HttpProbe for LocalHost {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.http.get(url).await
    }
}

impl MetadataClient for LocalHost {
    async fn acquire_token(&self, ttl_secs: u64) -> Result<String> {
        self.http.acquire_token(ttl_secs).await
    }

    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<String> {
        self.http.fetch(path, token).await
    }
}

impl LocalFs for LocalHost {
    async fn file_mode(&self, path: &Path) -> Result<Option<u32>> {
        self.fs.file_mode(path).await
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        self.fs.read_optional(path).await
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.fs.set_mode(path, mode).await
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        self.fs.write_atomic(path, contents, mode).await
    }
}

impl MetricsSampler for LocalHost {
    async fn cpu_percent(&self) -> Result<f64> {
        metrics::cpu(&self.proc_root).await
    }

    async fn memory_percent(&self) -> Result<f64> {
        metrics::memory(&self.proc_root).await
    }

    async fn disk_percent(&self, mount: &str) -> Result<f64> {
        metrics::disk(&self.runner, mount).await
    }

    async fn load_average(&self) -> Result<LoadAverage> {
        metrics::load(&self.proc_root).await
    }
}

impl ServiceManager for LocalHost {
    async fn active_state(&self, unit: &str) -> Result<String> {
        systemd::active_state(&self.runner, unit).await
    }

    async fn is_registered(&self, unit: &str) -> Result<bool> {
        systemd::is_registered(&self.runner, unit).await
    }

    async fn start_unit(&self, unit: &str) -> Result<()> {
        systemd::start_unit(&self.runner, unit).await
    }

    async fn stop_unit(&self, unit: &str) -> Result<()> {
        systemd::stop_unit(&self.runner, unit).await
    }
}

impl ProcessControl for LocalHost {
    async fn is_alive(&self, pid: u32) -> Result<bool> {
        process::is_alive(&self.runner, pid).await
    }

    async fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        process::signal(&self.runner, pid, signal).await
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<u32> {
        process::launch(spec)
    }

    async fn listeners(&self, port: u16) -> Result<Vec<u32>> {
        process::listeners(&self.runner, port).await
    }
}

impl HandleStore for LocalHost {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>> {
        self.handles.load_handle().await
    }

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<()> {
        self.handles.save_handle(handle).await
    }

    async fn clear_handle(&self) -> Result<()> {
        self.handles.clear_handle().await
    }
}
