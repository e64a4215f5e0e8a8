//! Progress events — lets the CLI show what the orchestrator is doing
//! while a message is in flight.

use tokio::sync::broadcast;

/// A progress event emitted during one orchestration round.
#[derive(Debug, Clone)]
pub struct SystemEvent {
    pub event_type: String,
    pub data: serde_json::Value,
}

impl SystemEvent {
    pub fn thinking(round: usize) -> Self {
        Self {
            event_type: "agent_think".to_string(),
            data: serde_json::json!({ "round": round }),
        }
    }

    pub fn tool_use(tool: &str) -> Self {
        Self {
            event_type: "tool_use".to_string(),
            data: serde_json::json!({ "tool": tool }),
        }
    }

    pub fn tool_done(tool: &str, success: bool) -> Self {
        Self {
            event_type: "tool_result".to_string(),
            data: serde_json::json!({ "tool": tool, "success": success }),
        }
    }

    /// Format an event into a human-readable spinner line.
    pub fn format_status(&self) -> Option<String> {
        match self.event_type.as_str() {
            "agent_think" => {
                let round = self.data["round"].as_u64().unwrap_or(0);
                if round == 1 {
                    Some("🧠 Analyzing your question...".to_string())
                } else {
                    Some(format!("🔄 Processing results, reasoning step {}...", round))
                }
            }

            "tool_use" => {
                let tool = self.data["tool"].as_str().unwrap_or("tool");
                let action = match tool {
                    "get_system_info" => "💻 Checking system info...".to_string(),
                    "get_cpu_usage" => "⚙️  Reading CPU load...".to_string(),
                    "get_memory_usage" => "🧮 Measuring memory usage...".to_string(),
                    "list_processes" => "📋 Listing top processes...".to_string(),
                    "get_disk_usage" => "💾 Checking disk space...".to_string(),
                    "get_network_info" => "🌐 Inspecting network interfaces...".to_string(),
                    "store_in_file" => "✏️  Writing report to disk...".to_string(),
                    _ => format!("🛠️  Running '{}'...", tool),
                };
                Some(action)
            }

            "tool_result" => {
                if self.data["success"].as_bool().unwrap_or(true) {
                    Some("✅ Done, reasoning about results...".to_string())
                } else {
                    let tool = self.data["tool"].as_str().unwrap_or("tool");
                    Some(format!("⚠️  '{}' failed, explaining what happened...", tool))
                }
            }

            _ => None,
        }
    }
}

/// Broadcast bus for progress events. Single process, fire and forget:
/// publishing without subscribers is fine.
pub struct EventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, event: SystemEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
