//! Configuration management for sysmate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SysmateError};
use crate::provider::ProviderConfig;

/// Top-level sysmate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SysmateConfig {
    /// Model provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Orchestrator-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Max tool-call rounds per message.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Max retained conversation turns.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Custom system prompt (None = use default).
    pub system_prompt: Option<String>,

    /// Directory reports are written to (None = ./reports).
    pub reports_dir: Option<String>,
}

fn default_max_rounds() -> usize {
    10
}

fn default_history_cap() -> usize {
    50
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            history_cap: 50,
            system_prompt: None,
            reports_dir: None,
        }
    }
}

impl SysmateConfig {
    /// Load config from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| SysmateError::Config(format!("Failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| SysmateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SysmateError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sysmate")
            .join("config.toml")
    }
}
