//! Error types for sysmate.

use thiserror::Error;

/// Core error type for all sysmate operations.
#[derive(Error, Debug)]
pub enum SysmateError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid tool arguments: {0}")]
    Schema(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tool-call round limit reached ({0})")]
    RoundLimit(usize),

    #[error("{0}")]
    Other(String),
}

impl SysmateError {
    /// True for failures of the model transport itself (network, auth,
    /// quota). These abort the in-flight message; tool-level failures
    /// never surface here — they are returned to the model as data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, SysmateError>;
