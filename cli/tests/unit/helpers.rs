//! Shared test helpers: a recording in-memory host and output constructors.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use ndt_ops::application::ports::{
    CommandRunner, HandleStore, HttpProbe, HttpResponse, LaunchSpec, LocalFs, MetadataClient,
    MetricsSampler, ProcessControl, ServiceManager, Signal,
};
use ndt_ops::domain::config::OpsConfig;
use ndt_ops::domain::lifecycle::ProcessHandle;
use ndt_ops::domain::metrics::LoadAverage;

// ── ExitStatus construction ──────────────────────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success).
///
/// The raw wait-status encodes the exit code in bits 8–15.
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Config ───────────────────────────────────────────────────────────────────

pub const CRED_PATH: &str = "/home/ubuntu/.aws/credentials";
pub const LIVE_PID: u32 = 100;

/// Default configuration with every wait shortened to zero.
pub fn test_config() -> OpsConfig {
    let mut cfg = OpsConfig::default();
    cfg.timeouts.remediation_grace_secs = 0;
    cfg.timeouts.stop_grace_secs = 0;
    cfg
}

pub fn handle(pid: u32) -> ProcessHandle {
    ProcessHandle {
        pid,
        port: 8000,
        bind_address: "0.0.0.0".to_string(),
        started_at: Utc::now(),
    }
}

/// Handle recorded long enough ago that its PID must prove it holds the port.
pub fn stale_handle(pid: u32) -> ProcessHandle {
    ProcessHandle {
        started_at: Utc::now() - chrono::TimeDelta::days(1),
        ..handle(pid)
    }
}

// ── FakeHost ─────────────────────────────────────────────────────────────────

/// In-memory host. Every port call is served from the state below and the
/// interesting ones are recorded for assertions.
///
/// `redis-cli` answers `PONG` exactly when the cache unit is `active`, so a
/// successful start remediation is observable through the next ping.
pub struct FakeHost {
    /// `(command prefix, output)`, first match wins.
    pub responses: Mutex<Vec<(String, Output)>>,
    pub commands: Mutex<Vec<String>>,
    pub health: Mutex<Option<HttpResponse>>,
    pub metadata: Option<HashMap<String, String>>,
    pub token_available: bool,
    pub metadata_calls: Mutex<Vec<(String, bool)>>,
    pub modes: Mutex<HashMap<PathBuf, u32>>,
    pub files: Mutex<HashMap<PathBuf, (String, u32)>>,
    pub units: Mutex<HashMap<String, String>>,
    pub registered: HashSet<String>,
    /// Units that become `active` when started.
    pub startable: HashSet<String>,
    pub unit_starts: Mutex<Vec<String>>,
    pub unit_stops: Mutex<Vec<String>>,
    pub alive: Mutex<HashSet<u32>>,
    /// PIDs that ignore the graceful signal.
    pub stubborn: HashSet<u32>,
    pub signals: Mutex<Vec<(u32, Signal)>>,
    pub listening: HashMap<u16, Vec<u32>>,
    pub launches: Mutex<Vec<LaunchSpec>>,
    pub handle: Mutex<Option<ProcessHandle>>,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl FakeHost {
    /// A host on which every check passes: dependencies active, credentials
    /// valid, recorded process alive and answering healthy.
    pub fn healthy() -> Self {
        let responses = vec![
            (
                "aws sts get-caller-identity".to_string(),
                ok_output(br#"{"Arn":"arn:aws:iam::123456789012:user/ndt"}"#),
            ),
            ("aws ec2 describe-instances".to_string(), ok_output(b"{}")),
            ("docker info".to_string(), ok_output(b"24.0.7\n")),
            ("/opt/ndt/venv/bin/python -c".to_string(), ok_output(b"")),
        ];
        let units = HashMap::from([
            ("docker".to_string(), "active".to_string()),
            ("redis-server".to_string(), "active".to_string()),
        ]);
        Self {
            responses: Mutex::new(responses),
            commands: Mutex::new(Vec::new()),
            health: Mutex::new(Some(HttpResponse {
                status: 200,
                body: r#"{"status":"healthy","timestamp":"2026-01-01T00:00:00Z"}"#.to_string(),
            })),
            metadata: None,
            token_available: false,
            metadata_calls: Mutex::new(Vec::new()),
            modes: Mutex::new(HashMap::from([(PathBuf::from(CRED_PATH), 0o600)])),
            files: Mutex::new(HashMap::new()),
            units: Mutex::new(units),
            registered: HashSet::new(),
            startable: HashSet::new(),
            unit_starts: Mutex::new(Vec::new()),
            unit_stops: Mutex::new(Vec::new()),
            alive: Mutex::new(HashSet::from([LIVE_PID])),
            stubborn: HashSet::new(),
            signals: Mutex::new(Vec::new()),
            listening: HashMap::from([(8000, vec![LIVE_PID])]),
            launches: Mutex::new(Vec::new()),
            handle: Mutex::new(Some(handle(LIVE_PID))),
            cpu: 12.0,
            memory: 40.0,
            disk: 55.0,
        }
    }

    /// A host where nothing is running yet but every precondition holds.
    pub fn idle() -> Self {
        let host = Self::healthy();
        *host.handle.lock().expect("lock") = None;
        host.alive.lock().expect("lock").clear();
        *host.health.lock().expect("lock") = None;
        host
    }

    /// Put `response` ahead of any existing match for `prefix`.
    pub fn respond(&self, prefix: &str, response: Output) {
        self.responses
            .lock()
            .expect("lock")
            .insert(0, (prefix.to_string(), response));
    }

    pub fn set_unit(&self, unit: &str, state: &str) {
        self.units
            .lock()
            .expect("lock")
            .insert(unit.to_string(), state.to_string());
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands
            .lock()
            .expect("lock")
            .iter()
            .any(|c| c.starts_with(prefix))
    }

    pub fn mode_of(&self, path: &str) -> Option<u32> {
        self.modes.lock().expect("lock").get(Path::new(path)).copied()
    }

    pub fn saved_handle(&self) -> Option<ProcessHandle> {
        self.handle.lock().expect("lock").clone()
    }

    pub fn sent(&self) -> Vec<(u32, Signal)> {
        self.signals.lock().expect("lock").clone()
    }

    fn unit_state(&self, unit: &str) -> String {
        self.units
            .lock()
            .expect("lock")
            .get(unit)
            .cloned()
            .unwrap_or_else(|| "inactive".to_string())
    }
}

impl CommandRunner for FakeHost {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, Duration::from_secs(1)).await
    }

    async fn run_with_timeout(&self, program: &str, args: &[&str], _: Duration) -> Result<Output> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands.lock().expect("lock").push(line.clone());
        if program == "redis-cli" {
            return Ok(if self.unit_state("redis-server") == "active" {
                ok_output(b"PONG\n")
            } else {
                err_output(1, b"Could not connect to Redis at 127.0.0.1:6379: Connection refused")
            });
        }
        let responses = self.responses.lock().expect("lock");
        Ok(responses
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(
                || err_output(127, format!("{program}: command not found").as_bytes()),
                |(_, out)| out.clone(),
            ))
    }
}

impl HttpProbe for FakeHost {
    async fn get(&self, _url: &str) -> Result<HttpResponse> {
        self.health
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }
}

impl MetadataClient for FakeHost {
    async fn acquire_token(&self, _ttl_secs: u64) -> Result<String> {
        if self.token_available && self.metadata.is_some() {
            Ok("token-abc".to_string())
        } else {
            anyhow::bail!("token endpoint unavailable")
        }
    }

    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<String> {
        self.metadata_calls
            .lock()
            .expect("lock")
            .push((path.to_string(), token.is_some()));
        self.metadata
            .as_ref()
            .and_then(|m| m.get(path).cloned())
            .ok_or_else(|| anyhow::anyhow!("timed out"))
    }
}

impl LocalFs for FakeHost {
    async fn file_mode(&self, path: &Path) -> Result<Option<u32>> {
        if let Some(mode) = self.modes.lock().expect("lock").get(path) {
            return Ok(Some(*mode));
        }
        Ok(self.files.lock().expect("lock").get(path).map(|(_, m)| *m))
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.files.lock().expect("lock").get(path).map(|(c, _)| c.clone()))
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        let mut modes = self.modes.lock().expect("lock");
        match modes.get_mut(path) {
            Some(m) => {
                *m = mode;
                Ok(())
            }
            None => anyhow::bail!("{}: no such file", path.display()),
        }
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        self.files.lock().expect("lock").insert(
            path.to_path_buf(),
            (String::from_utf8_lossy(contents).into_owned(), mode),
        );
        Ok(())
    }
}

impl MetricsSampler for FakeHost {
    async fn cpu_percent(&self) -> Result<f64> {
        Ok(self.cpu)
    }
    async fn memory_percent(&self) -> Result<f64> {
        Ok(self.memory)
    }
    async fn disk_percent(&self, _mount: &str) -> Result<f64> {
        Ok(self.disk)
    }
    async fn load_average(&self) -> Result<LoadAverage> {
        Ok(LoadAverage {
            one: 0.5,
            five: 0.4,
            fifteen: 0.3,
        })
    }
}

impl ServiceManager for FakeHost {
    async fn active_state(&self, unit: &str) -> Result<String> {
        Ok(self.unit_state(unit))
    }

    async fn is_registered(&self, unit: &str) -> Result<bool> {
        Ok(self.registered.contains(unit))
    }

    async fn start_unit(&self, unit: &str) -> Result<()> {
        self.unit_starts.lock().expect("lock").push(unit.to_string());
        if self.startable.contains(unit) {
            self.set_unit(unit, "active");
            Ok(())
        } else {
            anyhow::bail!("Job for {unit}.service failed")
        }
    }

    async fn stop_unit(&self, unit: &str) -> Result<()> {
        self.unit_stops.lock().expect("lock").push(unit.to_string());
        self.set_unit(unit, "inactive");
        Ok(())
    }
}

impl ProcessControl for FakeHost {
    async fn is_alive(&self, pid: u32) -> Result<bool> {
        Ok(self.alive.lock().expect("lock").contains(&pid))
    }

    async fn signal(&self, pid: u32, signal: Signal) -> Result<()> {
        self.signals.lock().expect("lock").push((pid, signal));
        if signal == Signal::Kill || !self.stubborn.contains(&pid) {
            self.alive.lock().expect("lock").remove(&pid);
        }
        Ok(())
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<u32> {
        self.launches.lock().expect("lock").push(spec.clone());
        let pid = 4242;
        self.alive.lock().expect("lock").insert(pid);
        Ok(pid)
    }

    async fn listeners(&self, port: u16) -> Result<Vec<u32>> {
        let alive = self.alive.lock().expect("lock");
        Ok(self
            .listening
            .get(&port)
            .map(|pids| pids.iter().copied().filter(|p| alive.contains(p)).collect())
            .unwrap_or_default())
    }
}

impl HandleStore for FakeHost {
    async fn load_handle(&self) -> Result<Option<ProcessHandle>> {
        Ok(self.handle.lock().expect("lock").clone())
    }

    async fn save_handle(&self, handle: &ProcessHandle) -> Result<()> {
        *self.handle.lock().expect("lock") = Some(handle.clone());
        Ok(())
    }

    async fn clear_handle(&self) -> Result<()> {
        *self.handle.lock().expect("lock") = None;
        Ok(())
    }
}
