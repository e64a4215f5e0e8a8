//! Model orchestrator — drives the request / tool-call / tool-result /
//! response cycle against the model.
//!
//! One externally visible operation: [`Orchestrator::send_message`].
//! Each call walks Idle → AwaitingModel ⇄ ExecutingTools → Idle:
//! 1. Append the user turn to history.
//! 2. Send the full turn history plus the advertised tool set to the model.
//! 3. If the reply requests tool calls, dispatch the whole batch, record
//!    request and result turns, and go around again.
//! 4. A reply with no tool calls is the final answer.
//!
//! Turns after the initiating user turn are staged locally and committed
//! only when the cycle completes, so a transport failure mid-call leaves
//! the history consistent: the user turn and nothing else.

use std::sync::Arc;

use crate::bus::{EventBus, SystemEvent};
use crate::dispatch::{ToolCallRequest, ToolDispatcher};
use crate::error::{Result, SysmateError};
use crate::history::{ConversationHistory, DEFAULT_HISTORY_CAP, Turn};
use crate::message::{ChatMessage, LlmResponse, ToolCall};
use crate::provider::{ChatRequest, LlmProvider};
use crate::tool::ToolRegistry;

/// Configuration for the orchestration loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds within one message before giving up.
    pub max_rounds: usize,
    /// Maximum retained turns in the conversation history.
    pub history_cap: usize,
    /// System instruction sent on every round.
    pub system_prompt: String,
    /// Model override (None = provider default).
    pub model: Option<String>,
    /// Max tokens per response.
    pub max_tokens: u32,
    /// Temperature for generation.
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            history_cap: DEFAULT_HISTORY_CAP,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: None,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// The orchestrator owns the conversation state and the tool surface.
/// Not reentrant: one in-flight `send_message` per instance, which the
/// `&mut self` receiver enforces for the single-session CLI.
pub struct Orchestrator {
    pub config: OrchestratorConfig,
    registry: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    history: ConversationHistory,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, registry: Arc<ToolRegistry>) -> Self {
        let history = ConversationHistory::new(config.history_cap);
        Self {
            dispatcher: ToolDispatcher::new(registry.clone()),
            config,
            registry,
            history,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Read access to the retained turn sequence.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Explicit user reset.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Send one user message and drive the loop to a final text answer.
    ///
    /// Tool-level failures stay conversational — the model sees them as
    /// result envelopes. Transport failures and an exceeded round cap
    /// abort the call with an error, leaving only the user turn committed.
    pub async fn send_message(
        &mut self,
        provider: &dyn LlmProvider,
        user_text: &str,
        bus: Option<&EventBus>,
    ) -> Result<String> {
        self.history.push(Turn::User {
            text: user_text.to_string(),
        });

        let tool_defs = self.registry.definitions();
        let mut staged: Vec<Turn> = Vec::new();
        let mut rounds = 0;

        let final_text = loop {
            rounds += 1;
            if rounds > self.config.max_rounds {
                tracing::error!(
                    "Model kept requesting tools past the round limit ({})",
                    self.config.max_rounds
                );
                return Err(SysmateError::RoundLimit(self.config.max_rounds));
            }

            tracing::info!("Orchestrator round {}/{}", rounds, self.config.max_rounds);
            if let Some(b) = bus {
                b.publish(SystemEvent::thinking(rounds));
            }

            let request = ChatRequest {
                messages: self.build_messages(&staged),
                tools: tool_defs.clone(),
                model: self.config.model.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };

            // Transport failure propagates here; staged turns are dropped
            // so history keeps only the user turn for this attempt.
            let response: LlmResponse = provider.chat(request).await?;

            tracing::debug!(
                "Model reply: finish_reason={}, tool_calls={}, tokens={}",
                response.finish_reason,
                response.tool_calls.len(),
                response.usage.total_tokens,
            );

            if response.has_tool_calls() {
                let requests = parse_requests(&response.tool_calls);

                if let Some(b) = bus {
                    for req in &requests {
                        b.publish(SystemEvent::tool_use(&req.name));
                    }
                }

                let records = self.dispatcher.execute_batch(&requests).await;

                if let Some(b) = bus {
                    for rec in &records {
                        b.publish(SystemEvent::tool_done(&rec.name, rec.result.is_success()));
                    }
                }

                staged.push(Turn::ToolCalls { calls: requests });
                staged.push(Turn::ToolResults { records });
                continue;
            }

            break response.content.unwrap_or_default();
        };

        staged.push(Turn::ModelText {
            text: final_text.clone(),
        });
        for turn in staged {
            self.history.push(turn);
        }

        tracing::info!(
            "Message completed in {} round(s), answer: {} chars",
            rounds,
            final_text.len()
        );

        Ok(final_text)
    }

    /// Render system prompt + committed history + staged turns into the
    /// message list for one model request.
    fn build_messages(&self, staged: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(&self.config.system_prompt)];
        for turn in self.history.turns().chain(staged.iter()) {
            render_turn(turn, &mut messages);
        }
        messages
    }
}

fn render_turn(turn: &Turn, messages: &mut Vec<ChatMessage>) {
    match turn {
        Turn::User { text } => messages.push(ChatMessage::user(text)),
        Turn::ModelText { text } => messages.push(ChatMessage::assistant(text)),
        Turn::ToolCalls { calls } => {
            let wire: Vec<ToolCall> = calls
                .iter()
                .map(|c| ToolCall {
                    id: c.id.clone(),
                    r#type: "function".to_string(),
                    function: crate::message::FunctionCall {
                        name: c.name.clone(),
                        arguments: c.arguments.to_string(),
                    },
                })
                .collect();
            messages.push(ChatMessage::assistant_with_tools(None, wire));
        }
        Turn::ToolResults { records } => {
            for rec in records {
                messages.push(ChatMessage::tool_result(
                    &rec.id,
                    &rec.name,
                    &rec.result.to_payload().to_string(),
                ));
            }
        }
    }
}

/// Decode wire tool calls into dispatchable requests. Providers that omit
/// call ids get positional fallbacks so request/result pairing survives
/// the replay.
fn parse_requests(calls: &[ToolCall]) -> Vec<ToolCallRequest> {
    calls
        .iter()
        .enumerate()
        .map(|(i, call)| ToolCallRequest {
            id: if call.id.is_empty() {
                format!("call_{i}")
            } else {
                call.id.clone()
            },
            name: call.function.name.clone(),
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| serde_json::json!({})),
        })
        .collect()
}

/// Count the committed tool-call and tool-result turns. The two are always
/// appended as a pair, so these stay equal for any run of batches.
pub fn call_result_turn_counts(history: &ConversationHistory) -> (usize, usize) {
    let mut calls = 0;
    let mut results = 0;
    for turn in history.turns() {
        match turn {
            Turn::ToolCalls { .. } => calls += 1,
            Turn::ToolResults { .. } => results += 1,
            _ => {}
        }
    }
    (calls, results)
}

/// Default system instruction for the monitoring assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful system monitoring assistant. You have access to tools that provide real-time information about this computer's hardware, processes, and performance.

When a user asks about the system:
- Use the appropriate tools to gather accurate, real-time data
- Provide clear, concise explanations
- Interpret the data in a helpful way (e.g., "CPU usage is high" rather than only raw numbers)
- When asked to generate reports, create well-formatted, comprehensive reports
- Be proactive in suggesting relevant follow-up actions

Available tools:
- get_system_info: Basic system information
- get_cpu_usage: Current CPU statistics
- get_memory_usage: Memory/RAM statistics
- list_processes: Top processes by CPU and memory
- get_disk_usage: Disk space information
- get_network_info: Network interfaces and statistics
- store_in_file: Save content to a file

Be conversational and helpful. Explain technical terms when appropriate."#;
