//! Tool dispatcher — executes requested calls and normalizes every
//! outcome into a uniform result envelope.
//!
//! Nothing here ever bubbles an error up to the orchestrator: an unknown
//! tool name, bad arguments, or a failing collaborator all degrade into a
//! `Failure` the model can read and react to.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tool::ToolRegistry;

/// The uniform envelope returned for every tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "lowercase")]
pub enum ToolResult {
    Success(Value),
    Failure(String),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Render the envelope as the JSON payload the model sees in a tool
    /// result message.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Success(data) => json!({ "success": true, "data": data }),
            Self::Failure(message) => json!({ "success": false, "error": message }),
        }
    }
}

/// A single tool call requested by the model, with arguments already
/// parsed out of the wire encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A requested call paired with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: String,
    pub name: String,
    pub result: ToolResult,
}

/// Maps tool-call requests onto registered tools.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call. Infallible by design: every failure mode is
    /// folded into the envelope.
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        let tool = match self.registry.get(name) {
            Some(t) => t,
            None => {
                tracing::warn!("Model requested unknown tool: {}", name);
                return ToolResult::Failure(format!("unknown tool: {}", name));
            }
        };

        if let Err(e) = self.registry.validate(name, &args) {
            return ToolResult::Failure(e.to_string());
        }

        tracing::info!("Executing tool: {} with args: {}", name, args);
        match tool.execute(args).await {
            Ok(data) => {
                tracing::debug!("Tool {} completed", name);
                ToolResult::Success(data)
            }
            Err(e) => {
                tracing::error!("Tool {} failed: {}", name, e);
                ToolResult::Failure(e.to_string())
            }
        }
    }

    /// Execute a whole batch of calls from one model reply.
    ///
    /// Calls within a batch are independent and run concurrently, but the
    /// records come back in request order and there is exactly one record
    /// per request — the model never sees a partial round.
    pub async fn execute_batch(&self, requests: &[ToolCallRequest]) -> Vec<ToolRecord> {
        let futures = requests
            .iter()
            .map(|req| self.execute(&req.name, req.arguments.clone()));

        let results = futures::future::join_all(futures).await;

        requests
            .iter()
            .zip(results)
            .map(|(req, result)| ToolRecord {
                id: req.id.clone(),
                name: req.name.clone(),
                result,
            })
            .collect()
    }
}
