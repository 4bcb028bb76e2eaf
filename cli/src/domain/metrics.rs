//! Parsers for host resource counters.
//!
//! Inputs are the raw text of `/proc/stat`, `/proc/meminfo`, `/proc/loadavg`
//! and `df -P` output. Sampling is the infrastructure layer's job.

use serde::Serialize;

/// One point-in-time reading of the three threshold metrics, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

/// Aggregate CPU counters from the first `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[must_use]
pub fn parse_proc_stat(text: &str) -> Option<CpuTimes> {
    let line = text.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

/// Busy percentage between two samples. `None` when no ticks elapsed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cpu_percent(before: CpuTimes, after: CpuTimes) -> Option<f64> {
    let total = after.total.checked_sub(before.total)?;
    let idle = after.idle.checked_sub(before.idle)?;
    if total == 0 {
        return None;
    }
    Some((total.saturating_sub(idle)) as f64 * 100.0 / total as f64)
}

/// Used memory percentage from `MemTotal` and `MemAvailable`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_meminfo(text: &str) -> Option<f64> {
    let field = |name: &str| -> Option<u64> {
        text.lines()
            .find_map(|l| l.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|v| v.parse().ok())
    };
    let total = field("MemTotal")?;
    let available = field("MemAvailable")?;
    if total == 0 {
        return None;
    }
    Some(total.saturating_sub(available) as f64 * 100.0 / total as f64)
}

/// Capacity percentage from the data row of `df -P <mount>`.
#[must_use]
pub fn parse_df(text: &str) -> Option<f64> {
    let row = text.lines().nth(1)?;
    row.split_whitespace()
        .nth(4)?
        .strip_suffix('%')?
        .parse()
        .ok()
}

#[must_use]
pub fn parse_loadavg(text: &str) -> Option<LoadAverage> {
    let mut parts = text.split_whitespace().map(str::parse::<f64>);
    Some(LoadAverage {
        one: parts.next()?.ok()?,
        five: parts.next()?.ok()?,
        fifteen: parts.next()?.ok()?,
    })
}
