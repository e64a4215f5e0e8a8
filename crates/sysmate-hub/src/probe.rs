//! System probe — collects CPU, memory, process, disk, and network
//! snapshots for the read-only tools.
//!
//! The [`SystemProbe`] trait is the collaborator boundary the tools talk
//! to. [`LinuxProbe`] reads `/proc` and `/sys` directly and shells out
//! for the few things that have no stable file interface (`ps`, `df`,
//! `ip`). Values are pre-formatted for the model the way a human would
//! read them ("7.02 GB", "45.32%").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use sysmate_core::error::{Result, SysmateError};

// ─── Snapshot types ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsInfo {
    pub platform: String,
    pub distro: String,
    pub release: String,
    pub arch: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuSpec {
    pub brand: String,
    pub cores: usize,
    pub speed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTotals {
    pub total: String,
    pub free: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uptime {
    pub seconds: u64,
    pub formatted: String,
}

/// Basic system overview: OS, CPU, memory totals, uptime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: OsInfo,
    pub cpu: CpuSpec,
    pub memory: MemoryTotals,
    pub uptime: Uptime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreLoad {
    pub core: usize,
    pub load: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    pub average_load: String,
    pub cores: Vec<CoreLoad>,
    pub temperature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub total: String,
    pub used: String,
    pub free: String,
    pub usage_percent: String,
    pub available: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: i64,
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessList {
    #[serde(rename = "topCPU")]
    pub top_cpu: Vec<ProcessSample>,
    #[serde(rename = "topMemory")]
    pub top_memory: Vec<ProcessSample>,
    #[serde(rename = "totalProcesses")]
    pub total_processes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub filesystem: String,
    pub mount: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub usage_percent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub ip4: String,
    pub ip6: String,
    pub mac: String,
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    pub interface: String,
    pub rx_bytes: String,
    pub tx_bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interfaces: Vec<NetworkInterface>,
    pub stats: Vec<InterfaceStats>,
}

// ─── Trait ─────────────────────────────────────────────────

/// The system-inspection collaborator. All operations are read-only and
/// side-effect-free; failures become [`SysmateError::ToolExecution`] and
/// degrade into failure envelopes at dispatch.
#[async_trait]
pub trait SystemProbe: Send + Sync {
    async fn system_info(&self) -> Result<SystemInfo>;
    async fn cpu_usage(&self) -> Result<CpuUsage>;
    async fn memory_usage(&self) -> Result<MemoryUsage>;
    async fn process_list(&self) -> Result<ProcessList>;
    async fn disk_usage(&self) -> Result<Vec<DiskUsage>>;
    async fn network_info(&self) -> Result<NetworkInfo>;
}

// ─── Linux implementation ──────────────────────────────────

/// Probe backed by `/proc`, `/sys`, and small shell fallbacks.
pub struct LinuxProbe {
    /// Sampling window for CPU load measurement.
    sample_window: Duration,
}

impl LinuxProbe {
    pub fn new() -> Self {
        Self {
            sample_window: Duration::from_millis(200),
        }
    }
}

impl Default for LinuxProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_err(tool: &str, message: impl std::fmt::Display) -> SysmateError {
    SysmateError::ToolExecution {
        tool: tool.to_string(),
        message: message.to_string(),
    }
}

async fn read_file(tool: &str, path: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| probe_err(tool, format!("cannot read {}: {}", path, e)))
}

async fn run_cmd(cmd: &str) -> String {
    match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .await
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout).to_string(),
        Err(_) => String::new(),
    }
}

#[async_trait]
impl SystemProbe for LinuxProbe {
    async fn system_info(&self) -> Result<SystemInfo> {
        let release = read_file("get_system_info", "/proc/sys/kernel/osrelease")
            .await
            .unwrap_or_default();
        let hostname = read_file("get_system_info", "/proc/sys/kernel/hostname")
            .await
            .unwrap_or_default();
        let distro = read_file("get_system_info", "/etc/os-release")
            .await
            .ok()
            .and_then(|s| parse_os_release(&s))
            .unwrap_or_else(|| "unknown".to_string());

        let cpuinfo = read_file("get_system_info", "/proc/cpuinfo").await?;
        let meminfo = read_file("get_system_info", "/proc/meminfo").await?;
        let mem =
            parse_meminfo(&meminfo).ok_or_else(|| probe_err("get_system_info", "bad meminfo"))?;

        let uptime_secs = read_file("get_system_info", "/proc/uptime")
            .await?
            .split_whitespace()
            .next()
            .and_then(|s| s.parse::<f64>().ok())
            .map(|f| f as u64)
            .ok_or_else(|| probe_err("get_system_info", "bad uptime"))?;

        Ok(SystemInfo {
            os: OsInfo {
                platform: std::env::consts::OS.to_string(),
                distro,
                release: release.trim().to_string(),
                arch: std::env::consts::ARCH.to_string(),
                hostname: hostname.trim().to_string(),
            },
            cpu: parse_cpuinfo(&cpuinfo),
            memory: MemoryTotals {
                total: format_gb(mem.total_kb * 1024),
                free: format_gb(mem.free_kb * 1024),
            },
            uptime: Uptime {
                seconds: uptime_secs,
                formatted: format_uptime(uptime_secs),
            },
        })
    }

    async fn cpu_usage(&self) -> Result<CpuUsage> {
        // Load is a busy-time delta over a short sampling window.
        let before = read_file("get_cpu_usage", "/proc/stat").await?;
        tokio::time::sleep(self.sample_window).await;
        let after = read_file("get_cpu_usage", "/proc/stat").await?;

        let loads = compute_loads(
            &parse_cpu_times(&before),
            &parse_cpu_times(&after),
        );
        let (average, per_core) = match loads.split_first() {
            Some((avg, rest)) => (*avg, rest.to_vec()),
            None => return Err(probe_err("get_cpu_usage", "bad /proc/stat")),
        };

        let temperature = tokio::fs::read_to_string("/sys/class/thermal/thermal_zone0/temp")
            .await
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(|milli| format!("{:.1}°C", milli / 1000.0))
            .unwrap_or_else(|| "N/A".to_string());

        Ok(CpuUsage {
            average_load: format_pct(average),
            cores: per_core
                .iter()
                .enumerate()
                .map(|(i, load)| CoreLoad {
                    core: i + 1,
                    load: format_pct(*load),
                })
                .collect(),
            temperature,
        })
    }

    async fn memory_usage(&self) -> Result<MemoryUsage> {
        let meminfo = read_file("get_memory_usage", "/proc/meminfo").await?;
        let mem =
            parse_meminfo(&meminfo).ok_or_else(|| probe_err("get_memory_usage", "bad meminfo"))?;

        let total = mem.total_kb * 1024;
        let free = mem.free_kb * 1024;
        let available = mem.available_kb * 1024;
        let used = total.saturating_sub(available);
        let usage_percent = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(MemoryUsage {
            total: format_gb(total),
            used: format_gb(used),
            free: format_gb(free),
            usage_percent: format_pct(usage_percent),
            available: format_gb(available),
        })
    }

    async fn process_list(&self) -> Result<ProcessList> {
        let output = run_cmd("ps -eo pid=,comm=,%cpu=,%mem=").await;
        let samples = parse_ps(&output);
        if samples.is_empty() {
            return Err(probe_err("list_processes", "ps returned no processes"));
        }
        Ok(rank_processes(samples))
    }

    async fn disk_usage(&self) -> Result<Vec<DiskUsage>> {
        let output = run_cmd("df -P -B1").await;
        let disks = parse_df(&output);
        if disks.is_empty() {
            return Err(probe_err("get_disk_usage", "df returned no filesystems"));
        }
        Ok(disks)
    }

    async fn network_info(&self) -> Result<NetworkInfo> {
        let dev = read_file("get_network_info", "/proc/net/dev").await?;
        let stats = parse_net_dev(&dev);

        let ip4 = parse_ip_addr(&run_cmd("ip -o -4 addr show 2>/dev/null").await);
        let ip6 = parse_ip_addr(&run_cmd("ip -o -6 addr show 2>/dev/null").await);

        let mut interfaces = Vec::new();
        for stat in &stats {
            let name = stat.interface.clone();
            let mac = tokio::fs::read_to_string(format!("/sys/class/net/{}/address", name))
                .await
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            interfaces.push(NetworkInterface {
                ip4: ip4.get(&name).cloned().unwrap_or_default(),
                ip6: ip6.get(&name).cloned().unwrap_or_default(),
                internal: name == "lo",
                mac,
                name,
            });
        }

        Ok(NetworkInfo { interfaces, stats })
    }
}

// ─── Parsers and formatters ────────────────────────────────

pub(crate) fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / 1024.0 / 1024.0 / 1024.0)
}

pub(crate) fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

pub(crate) fn format_pct(value: f64) -> String {
    format!("{:.2}%", value)
}

/// "1d 2h 3m" (or "0m" for a freshly booted box).
pub(crate) fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

pub(crate) struct MeminfoKb {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
}

pub(crate) fn parse_meminfo(content: &str) -> Option<MeminfoKb> {
    let mut total = None;
    let mut free = None;
    let mut available = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else { continue };
        let value = parts.next().and_then(|v| v.parse::<u64>().ok());
        match key {
            "MemTotal:" => total = value,
            "MemFree:" => free = value,
            "MemAvailable:" => available = value,
            _ => {}
        }
    }

    Some(MeminfoKb {
        total_kb: total?,
        free_kb: free?,
        // Older kernels lack MemAvailable; fall back to MemFree.
        available_kb: available.or(free)?,
    })
}

fn parse_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|l| l.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim_matches('"').to_string())
}

fn parse_cpuinfo(content: &str) -> CpuSpec {
    let mut brand = "unknown".to_string();
    let mut speed = "unknown".to_string();
    let mut cores = 0usize;

    for line in content.lines() {
        if line.starts_with("processor") {
            cores += 1;
        } else if brand == "unknown" && line.starts_with("model name") {
            if let Some(v) = line.splitn(2, ':').nth(1) {
                brand = v.trim().to_string();
            }
        } else if speed == "unknown" && line.starts_with("cpu MHz") {
            if let Some(v) = line.splitn(2, ':').nth(1) {
                if let Ok(mhz) = v.trim().parse::<f64>() {
                    speed = format!("{:.2} GHz", mhz / 1000.0);
                }
            }
        }
    }

    CpuSpec { brand, cores, speed }
}

/// (idle, total) jiffy counters per `cpu*` line of /proc/stat, aggregate
/// line first.
pub(crate) fn parse_cpu_times(content: &str) -> Vec<(u64, u64)> {
    content
        .lines()
        .filter(|l| l.starts_with("cpu"))
        .map(|line| {
            let fields: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .filter_map(|f| f.parse().ok())
                .collect();
            // idle + iowait count as idle time
            let idle = fields.get(3).copied().unwrap_or(0) + fields.get(4).copied().unwrap_or(0);
            let total: u64 = fields.iter().sum();
            (idle, total)
        })
        .collect()
}

/// Busy percentage per counter pair across two samples.
pub(crate) fn compute_loads(before: &[(u64, u64)], after: &[(u64, u64)]) -> Vec<f64> {
    before
        .iter()
        .zip(after.iter())
        .map(|((idle_a, total_a), (idle_b, total_b))| {
            let total = total_b.saturating_sub(*total_a);
            let idle = idle_b.saturating_sub(*idle_a);
            if total == 0 {
                0.0
            } else {
                (total - idle.min(total)) as f64 / total as f64 * 100.0
            }
        })
        .collect()
}

pub(crate) fn parse_ps(output: &str) -> Vec<(i64, String, f64, f64)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse::<i64>().ok()?;
            let name = parts.next()?.to_string();
            let cpu = parts.next()?.parse::<f64>().ok()?;
            let mem = parts.next()?.parse::<f64>().ok()?;
            Some((pid, name, cpu, mem))
        })
        .collect()
}

pub(crate) fn rank_processes(samples: Vec<(i64, String, f64, f64)>) -> ProcessList {
    let total_processes = samples.len();

    let to_sample = |(pid, name, cpu, mem): &(i64, String, f64, f64)| ProcessSample {
        pid: *pid,
        name: name.clone(),
        cpu: format_pct(*cpu),
        memory: format_pct(*mem),
    };

    let mut by_cpu = samples.clone();
    by_cpu.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    let top_cpu = by_cpu.iter().take(10).map(to_sample).collect();

    let mut by_mem = samples;
    by_mem.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));
    let top_memory = by_mem.iter().take(10).map(to_sample).collect();

    ProcessList {
        top_cpu,
        top_memory,
        total_processes,
    }
}

pub(crate) fn parse_df(output: &str) -> Vec<DiskUsage> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 || !parts[0].starts_with('/') {
                return None;
            }
            let size: u64 = parts[1].parse().ok()?;
            let used: u64 = parts[2].parse().ok()?;
            let available: u64 = parts[3].parse().ok()?;
            Some(DiskUsage {
                filesystem: parts[0].to_string(),
                mount: parts[5..].join(" "),
                size: format_gb(size),
                used: format_gb(used),
                available: format_gb(available),
                usage_percent: parts[4].to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_net_dev(content: &str) -> Vec<InterfaceStats> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let fields: Vec<u64> = rest
                .split_whitespace()
                .filter_map(|f| f.parse().ok())
                .collect();
            Some(InterfaceStats {
                interface: name.trim().to_string(),
                rx_bytes: format_mb(fields.first().copied().unwrap_or(0)),
                tx_bytes: format_mb(fields.get(8).copied().unwrap_or(0)),
            })
        })
        .collect()
}

/// `ip -o addr show` output → interface name to first address.
pub(crate) fn parse_ip_addr(output: &str) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        // "2: eth0    inet 192.168.1.10/24 ..."
        if parts.len() >= 4 {
            let iface = parts[1].to_string();
            let addr = parts[3].split('/').next().unwrap_or("").to_string();
            map.entry(iface).or_insert(addr);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_with_two_decimals() {
        assert_eq!(format_gb(16 * 1024 * 1024 * 1024), "16.00 GB");
        assert_eq!(format_gb(7_549_747_200), "7.03 GB");
        assert_eq!(format_mb(1_048_576), "1.00 MB");
        assert_eq!(format_pct(45.319), "45.32%");
    }

    #[test]
    fn formats_uptime_parts() {
        assert_eq!(format_uptime(0), "0m");
        assert_eq!(format_uptime(59), "0m");
        assert_eq!(format_uptime(60), "1m");
        assert_eq!(format_uptime(3 * 3600 + 25 * 60), "3h 25m");
        assert_eq!(format_uptime(2 * 86400 + 3600 + 60), "2d 1h 1m");
    }

    #[test]
    fn parses_meminfo() {
        let content = "MemTotal:       16250000 kB\n\
                       MemFree:         8250000 kB\n\
                       MemAvailable:   11000000 kB\n\
                       Buffers:          500000 kB\n";
        let mem = parse_meminfo(content).unwrap();
        assert_eq!(mem.total_kb, 16_250_000);
        assert_eq!(mem.free_kb, 8_250_000);
        assert_eq!(mem.available_kb, 11_000_000);
    }

    #[test]
    fn meminfo_falls_back_without_memavailable() {
        let content = "MemTotal: 1000 kB\nMemFree: 400 kB\n";
        let mem = parse_meminfo(content).unwrap();
        assert_eq!(mem.available_kb, 400);
    }

    #[test]
    fn computes_busy_percentage_from_samples() {
        // 100 jiffies elapsed, 25 of them idle → 75% busy.
        let before = vec![(50, 1000)];
        let after = vec![(75, 1100)];
        let loads = compute_loads(&before, &after);
        assert_eq!(loads.len(), 1);
        assert!((loads[0] - 75.0).abs() < 0.01);
    }

    #[test]
    fn cpu_times_include_aggregate_and_cores() {
        let stat = "cpu  100 0 50 800 50 0 0 0 0 0\n\
                    cpu0 50 0 25 400 25 0 0 0 0 0\n\
                    cpu1 50 0 25 400 25 0 0 0 0 0\n\
                    intr 12345\n";
        let times = parse_cpu_times(stat);
        assert_eq!(times.len(), 3);
        // idle = idle + iowait
        assert_eq!(times[0].0, 850);
        assert_eq!(times[0].1, 1000);
    }

    #[test]
    fn ranks_processes_by_cpu_and_memory() {
        let samples = vec![
            (1, "init".to_string(), 0.1, 0.2),
            (42, "firefox".to_string(), 35.0, 18.5),
            (99, "postgres".to_string(), 5.0, 42.0),
        ];
        let list = rank_processes(samples);
        assert_eq!(list.total_processes, 3);
        assert_eq!(list.top_cpu[0].name, "firefox");
        assert_eq!(list.top_memory[0].name, "postgres");
        assert_eq!(list.top_memory[0].memory, "42.00%");
    }

    #[test]
    fn parses_df_rows_skipping_pseudo_filesystems() {
        let output = "Filesystem 1-blocks Used Available Capacity Mounted on\n\
                      /dev/sda1 107374182400 53687091200 53687091200 50% /\n\
                      tmpfs 1000000 0 1000000 0% /dev/shm\n";
        let disks = parse_df(output);
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].filesystem, "/dev/sda1");
        assert_eq!(disks[0].mount, "/");
        assert_eq!(disks[0].size, "100.00 GB");
        assert_eq!(disks[0].usage_percent, "50%");
    }

    #[test]
    fn parses_net_dev_counters() {
        let content = "Inter-|   Receive                                                |  Transmit\n\
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n\
    lo: 1048576    100    0    0    0     0          0         0  1048576    100    0    0    0     0       0          0\n\
  eth0: 2097152    200    0    0    0     0          0         0  4194304    400    0    0    0     0       0          0\n";
        let stats = parse_net_dev(content);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].interface, "lo");
        assert_eq!(stats[1].interface, "eth0");
        assert_eq!(stats[1].rx_bytes, "2.00 MB");
        assert_eq!(stats[1].tx_bytes, "4.00 MB");
    }

    #[test]
    fn parses_ip_addr_output() {
        let output = "1: lo    inet 127.0.0.1/8 scope host lo\n\
                      2: eth0    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0\n";
        let map = parse_ip_addr(output);
        assert_eq!(map.get("lo").unwrap(), "127.0.0.1");
        assert_eq!(map.get("eth0").unwrap(), "192.168.1.10");
    }
}
