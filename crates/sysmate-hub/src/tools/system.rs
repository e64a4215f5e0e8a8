//! Read-only system tools backed by a [`SystemProbe`].
//!
//! One tool per probe operation. All of them take no arguments and
//! return the probe's snapshot as structured JSON.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use sysmate_core::error::Result;
use sysmate_core::tool::Tool;

use crate::probe::SystemProbe;

/// Which probe operation a [`ProbeTool`] instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    SystemInfo,
    CpuUsage,
    MemoryUsage,
    Processes,
    DiskUsage,
    NetworkInfo,
}

impl ProbeKind {
    /// Catalog order, matching the model's instructions.
    pub const ALL: [ProbeKind; 6] = [
        ProbeKind::SystemInfo,
        ProbeKind::CpuUsage,
        ProbeKind::MemoryUsage,
        ProbeKind::Processes,
        ProbeKind::DiskUsage,
        ProbeKind::NetworkInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::SystemInfo => "get_system_info",
            ProbeKind::CpuUsage => "get_cpu_usage",
            ProbeKind::MemoryUsage => "get_memory_usage",
            ProbeKind::Processes => "list_processes",
            ProbeKind::DiskUsage => "get_disk_usage",
            ProbeKind::NetworkInfo => "get_network_info",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProbeKind::SystemInfo => {
                "Get basic system information: OS, CPU model, total memory, and uptime"
            }
            ProbeKind::CpuUsage => {
                "Get current CPU usage: average load, per-core load, and temperature"
            }
            ProbeKind::MemoryUsage => {
                "Get current memory usage: total, used, free, and usage percentage"
            }
            ProbeKind::Processes => {
                "List running processes: top 10 by CPU, top 10 by memory, and total count"
            }
            ProbeKind::DiskUsage => "Get disk usage for all mounted filesystems",
            ProbeKind::NetworkInfo => {
                "Get network interfaces with addresses and transfer statistics"
            }
        }
    }
}

/// A single read-only tool delegating to the probe.
pub struct ProbeTool {
    kind: ProbeKind,
    probe: Arc<dyn SystemProbe>,
}

impl ProbeTool {
    pub fn new(kind: ProbeKind, probe: Arc<dyn SystemProbe>) -> Self {
        Self { kind, probe }
    }
}

#[async_trait]
impl Tool for ProbeTool {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let snapshot = match self.kind {
            ProbeKind::SystemInfo => serde_json::to_value(self.probe.system_info().await?)?,
            ProbeKind::CpuUsage => serde_json::to_value(self.probe.cpu_usage().await?)?,
            ProbeKind::MemoryUsage => serde_json::to_value(self.probe.memory_usage().await?)?,
            ProbeKind::Processes => serde_json::to_value(self.probe.process_list().await?)?,
            ProbeKind::DiskUsage => serde_json::to_value(self.probe.disk_usage().await?)?,
            ProbeKind::NetworkInfo => serde_json::to_value(self.probe.network_info().await?)?,
        };
        Ok(snapshot)
    }
}
