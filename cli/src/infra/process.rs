//! Direct process control by PID: liveness, signals, port listeners and
//! detached launch.

use std::fs::OpenOptions;
use std::process::Stdio;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, LaunchSpec, Signal};

pub async fn is_alive(runner: &impl CommandRunner, pid: u32) -> Result<bool> {
    let pid = pid.to_string();
    let out = runner.run("kill", &["-0", &pid]).await?;
    Ok(out.status.success())
}

pub async fn signal(runner: &impl CommandRunner, pid: u32, signal: Signal) -> Result<()> {
    let pid_arg = pid.to_string();
    let out = runner.run("kill", &["-s", signal.name(), &pid_arg]).await?;
    anyhow::ensure!(
        out.status.success(),
        "kill -s {} {pid}: {}",
        signal.name(),
        String::from_utf8_lossy(&out.stderr).trim()
    );
    Ok(())
}

/// PIDs holding a TCP listen socket on `port`. `lsof` exits 1 when nothing
/// matches, which is an empty answer rather than an error.
pub async fn listeners(runner: &impl CommandRunner, port: u16) -> Result<Vec<u32>> {
    let selector = format!("-iTCP:{port}");
    let out = runner
        .run("lsof", &["-t", &selector, "-sTCP:LISTEN"])
        .await?;
    Ok(parse_pid_list(&String::from_utf8_lossy(&out.stdout)))
}

fn parse_pid_list(text: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = text
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Spawn `spec` in its own process group with output appended to its log
/// file. The child outlives this process.
pub fn launch(spec: &LaunchSpec) -> Result<u32> {
    let (program, args) = spec
        .argv
        .split_first()
        .context("empty launch command")?;
    if let Some(dir) = std::path::Path::new(&spec.log_file).parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&spec.log_file)
        .with_context(|| format!("opening log file {}", spec.log_file))?;
    let log_err = log.try_clone().context("duplicating log handle")?;

    let mut cmd = std::process::Command::new(program);
    cmd.args(args)
        .current_dir(&spec.working_dir)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let child = cmd
        .spawn()
        .with_context(|| format!("spawning {program}"))?;
    tracing::info!(pid = child.id(), program, "launched managed process");
    Ok(child.id())
}
