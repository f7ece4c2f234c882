//! Linux Metric Producers
//!
//! The three value sources behind the dashboard sections, all backed by
//! `/proc`. Parsing is kept in pure helpers so it can be tested against
//! captured file contents.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Mutex;

use super::{MetricProducer, SampleError};

fn read_proc(path: &str) -> Result<String, SampleError> {
    std::fs::read_to_string(Path::new(path)).map_err(|source| SampleError::Io {
        path: path.to_string(),
        source,
    })
}

fn parse_error(path: &str, detail: impl Into<String>) -> SampleError {
    SampleError::Parse {
        path: path.to_string(),
        detail: detail.into(),
    }
}

/// Render a byte count with a binary-unit suffix
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

// --- System section -------------------------------------------------------

/// Hostname, uptime, and memory usage
pub struct SystemProducer;

impl SystemProducer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProducer for SystemProducer {
    fn name(&self) -> &'static str {
        "system"
    }

    fn target(&self) -> &'static str {
        "system-data"
    }

    fn sample(&self) -> Result<String, SampleError> {
        let hostname = read_proc("/proc/sys/kernel/hostname")?;
        let uptime_secs = parse_uptime(&read_proc("/proc/uptime")?)?;
        let memory = parse_meminfo(&read_proc("/proc/meminfo")?)?;

        let used = memory.total_kb.saturating_sub(memory.available_kb) * 1024;
        let total = memory.total_kb * 1024;

        Ok(format!(
            "<table>\
             <tr><td>Hostname</td><td>{}</td></tr>\
             <tr><td>Uptime</td><td>{}</td></tr>\
             <tr><td>Memory</td><td>{} / {}</td></tr>\
             </table>",
            hostname.trim(),
            format_uptime(uptime_secs),
            format_bytes(used),
            format_bytes(total),
        ))
    }
}

#[derive(Debug)]
struct MemInfo {
    total_kb: u64,
    available_kb: u64,
}

fn parse_uptime(content: &str) -> Result<u64, SampleError> {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| parse_error("/proc/uptime", "missing uptime seconds"))
}

fn parse_meminfo(content: &str) -> Result<MemInfo, SampleError> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total_kb = parts.next().and_then(|v| v.parse().ok()),
            Some("MemAvailable:") => available_kb = parts.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    match (total_kb, available_kb) {
        (Some(total_kb), Some(available_kb)) => Ok(MemInfo {
            total_kb,
            available_kb,
        }),
        _ => Err(parse_error(
            "/proc/meminfo",
            "missing MemTotal or MemAvailable",
        )),
    }
}

// --- CPU section ----------------------------------------------------------

/// CPU model and aggregate usage.
///
/// Usage is the delta between the previous and current `/proc/stat`
/// counters, so the first sample after start reports a placeholder.
pub struct CpuProducer {
    previous: Mutex<Option<CpuTimes>>,
}

impl CpuProducer {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(None),
        }
    }
}

impl Default for CpuProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProducer for CpuProducer {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn target(&self) -> &'static str {
        "cpu-data"
    }

    fn sample(&self) -> Result<String, SampleError> {
        let model = parse_cpu_model(&read_proc("/proc/cpuinfo")?);
        let current = parse_cpu_times(&read_proc("/proc/stat")?)?;

        let usage = {
            let mut previous = self.previous.lock().unwrap_or_else(|e| e.into_inner());
            let usage = previous
                .as_ref()
                .and_then(|prev| usage_percent(prev, &current));
            *previous = Some(current);
            usage
        };

        let usage_cell = match usage {
            Some(pct) => format!("{:.1}%", pct),
            None => "--".to_string(),
        };

        Ok(format!(
            "<table>\
             <tr><td>Model</td><td>{}</td></tr>\
             <tr><td>Usage</td><td>{}</td></tr>\
             </table>",
            model, usage_cell,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CpuTimes {
    total: u64,
    idle: u64,
}

fn parse_cpu_model(content: &str) -> String {
    content
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split(':').nth(1))
        .map(|model| model.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parse the aggregate `cpu` line: user nice system idle iowait irq softirq...
fn parse_cpu_times(content: &str) -> Result<CpuTimes, SampleError> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| parse_error("/proc/stat", "missing aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map_while(|v| v.parse().ok())
        .collect();

    if fields.len() < 5 {
        return Err(parse_error("/proc/stat", "too few cpu fields"));
    }

    // idle + iowait both count as idle time
    let idle = fields[3] + fields[4];
    let total = fields.iter().sum();

    Ok(CpuTimes { total, idle })
}

fn usage_percent(prev: &CpuTimes, current: &CpuTimes) -> Option<f64> {
    let total = current.total.checked_sub(prev.total)?;
    let idle = current.idle.checked_sub(prev.idle)?;
    if total == 0 {
        return None;
    }
    Some(100.0 * (total - idle) as f64 / total as f64)
}

// --- Disk section ---------------------------------------------------------

/// Cumulative read/write volume per block device
pub struct DiskProducer;

impl DiskProducer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DiskProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProducer for DiskProducer {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn target(&self) -> &'static str {
        "disk-data"
    }

    fn sample(&self) -> Result<String, SampleError> {
        let disks = parse_diskstats(&read_proc("/proc/diskstats")?);

        if disks.is_empty() {
            return Ok("<p>no block devices</p>".to_string());
        }

        let mut table = String::from(
            "<table><tr><th>Device</th><th>Read</th><th>Written</th></tr>",
        );
        for disk in &disks {
            let _ = write!(
                table,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                disk.name,
                format_bytes(disk.sectors_read * SECTOR_SIZE),
                format_bytes(disk.sectors_written * SECTOR_SIZE),
            );
        }
        table.push_str("</table>");
        Ok(table)
    }
}

const SECTOR_SIZE: u64 = 512;

#[derive(Debug, PartialEq, Eq)]
struct DiskStat {
    name: String,
    sectors_read: u64,
    sectors_written: u64,
}

/// Parse `/proc/diskstats`, keeping whole devices and dropping
/// loop/ram/zram pseudo-devices. Lines that do not parse are skipped; a
/// malformed entry should not kill the whole section.
fn parse_diskstats(content: &str) -> Vec<DiskStat> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // major minor name reads _ sectors_read _ writes _ sectors_written
            if fields.len() < 10 {
                return None;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
                return None;
            }
            Some(DiskStat {
                name: name.to_string(),
                sectors_read: fields[5].parse().ok()?,
                sectors_written: fields[9].parse().ok()?,
            })
        })
        .collect()
}
