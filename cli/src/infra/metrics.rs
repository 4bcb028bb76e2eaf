//! Resource sampling from procfs and `df`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::domain::metrics::{
    LoadAverage, cpu_percent, parse_df, parse_loadavg, parse_meminfo, parse_proc_stat,
};

/// Gap between the two `/proc/stat` reads.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(500);

async fn read(proc_root: &Path, name: &str) -> Result<String> {
    let path = proc_root.join(name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

pub async fn cpu(proc_root: &Path) -> Result<f64> {
    let before = parse_proc_stat(&read(proc_root, "stat").await?).context("unparsable /proc/stat")?;
    tokio::time::sleep(CPU_SAMPLE_WINDOW).await;
    let after = parse_proc_stat(&read(proc_root, "stat").await?).context("unparsable /proc/stat")?;
    cpu_percent(before, after).context("no CPU ticks elapsed between samples")
}

pub async fn memory(proc_root: &Path) -> Result<f64> {
    parse_meminfo(&read(proc_root, "meminfo").await?).context("MemTotal/MemAvailable missing")
}

pub async fn load(proc_root: &Path) -> Result<LoadAverage> {
    parse_loadavg(&read(proc_root, "loadavg").await?).context("unparsable /proc/loadavg")
}

pub async fn disk(runner: &impl CommandRunner, mount: &str) -> Result<f64> {
    let out = runner.run("df", &["-P", mount]).await?;
    anyhow::ensure!(
        out.status.success(),
        "df -P {mount}: {}",
        String::from_utf8_lossy(&out.stderr).trim()
    );
    parse_df(&String::from_utf8_lossy(&out.stdout)).context("unparsable df output")
}
