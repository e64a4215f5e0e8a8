//! Orchestrator loop tests driven by a scripted in-memory provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use sysmate_core::error::{Result, SysmateError};
use sysmate_core::history::Turn;
use sysmate_core::message::{FunctionCall, LlmResponse, ToolCall};
use sysmate_core::orchestrator::{Orchestrator, OrchestratorConfig, call_result_turn_counts};
use sysmate_core::provider::{ChatRequest, LlmProvider};
use sysmate_core::tool::{Tool, ToolRegistry};

// ─── Scripted provider ─────────────────────────────────────

/// Replays a fixed sequence of responses and records every request it
/// received, so tests can assert on what the model was shown.
struct ScriptedProvider {
    script: Mutex<Vec<Result<LlmResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<LlmResponse>>) -> Self {
        let mut script = script;
        script.reverse();
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn chat(&self, request: ChatRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(SysmateError::Other("script exhausted".to_string())))
    }
}

fn tool_call_reply(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall {
                id: id.to_string(),
                r#type: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: args.to_string(),
                },
            })
            .collect(),
        model: "scripted-model".to_string(),
        usage: Default::default(),
        finish_reason: "tool_calls".to_string(),
    }
}

// ─── Fake tools ────────────────────────────────────────────

struct MemoryTool;

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "get_memory_usage"
    }
    fn description(&self) -> &str {
        "Get memory usage statistics"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }
    async fn execute(&self, _args: Value) -> Result<Value> {
        Ok(json!({
            "total": "15.49 GB",
            "used": "7.02 GB",
            "free": "8.47 GB",
            "usagePercent": "45.32%",
            "available": "8.90 GB"
        }))
    }
}

struct CpuTool;

#[async_trait]
impl Tool for CpuTool {
    fn name(&self) -> &str {
        "get_cpu_usage"
    }
    fn description(&self) -> &str {
        "Get CPU usage statistics"
    }
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {}, "required": [] })
    }
    async fn execute(&self, _args: Value) -> Result<Value> {
        Ok(json!({ "averageLoad": "12.50%" }))
    }
}

fn orchestrator(max_rounds: usize) -> Orchestrator {
    let mut registry = ToolRegistry::new();
    registry.register(MemoryTool);
    registry.register(CpuTool);
    Orchestrator::new(
        OrchestratorConfig {
            max_rounds,
            ..Default::default()
        },
        Arc::new(registry),
    )
}

fn turn_kinds(orch: &Orchestrator) -> Vec<&'static str> {
    orch.history()
        .turns()
        .map(|t| match t {
            Turn::User { .. } => "user",
            Turn::ModelText { .. } => "model_text",
            Turn::ToolCalls { .. } => "tool_calls",
            Turn::ToolResults { .. } => "tool_results",
        })
        .collect()
}

// ─── Tests ─────────────────────────────────────────────────

#[tokio::test]
async fn memory_question_commits_four_turns() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_call_reply(&[("call_0", "get_memory_usage", json!({}))])),
        Ok(LlmResponse::text(
            "You are using about 45% of your 15.49 GB of RAM.",
        )),
    ]);
    let mut orch = orchestrator(10);

    let answer = orch
        .send_message(&provider, "what's my memory usage?", None)
        .await
        .unwrap();

    assert!(!answer.is_empty());
    assert_eq!(
        turn_kinds(&orch),
        vec!["user", "tool_calls", "tool_results", "model_text"]
    );

    // The tool result shown to the model on round two is a success
    // envelope carrying the probe data.
    let second = provider.request(1);
    let tool_msg = second
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_0"))
        .expect("tool result message replayed to model");
    let payload: Value = serde_json::from_str(tool_msg.content.as_ref().unwrap()).unwrap();
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["data"]["usagePercent"], json!("45.32%"));
}

#[tokio::test]
async fn every_call_batch_gets_a_full_result_batch() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_call_reply(&[
            ("call_0", "get_cpu_usage", json!({})),
            ("call_1", "get_memory_usage", json!({})),
        ])),
        Ok(tool_call_reply(&[("call_2", "get_memory_usage", json!({}))])),
        Ok(LlmResponse::text("All healthy.")),
    ]);
    let mut orch = orchestrator(10);

    orch.send_message(&provider, "full health check please", None)
        .await
        .unwrap();

    let (calls, results) = call_result_turn_counts(orch.history());
    assert_eq!(calls, 2);
    assert_eq!(results, 2);

    // Each result batch pairs one-to-one, in order, with its call batch.
    let turns: Vec<&Turn> = orch.history().turns().collect();
    for pair in turns.windows(2) {
        if let (Turn::ToolCalls { calls }, Turn::ToolResults { records }) = (pair[0], pair[1]) {
            assert_eq!(calls.len(), records.len());
            for (call, record) in calls.iter().zip(records.iter()) {
                assert_eq!(call.id, record.id);
                assert_eq!(call.name, record.name);
            }
        }
    }
}

#[tokio::test]
async fn transport_failure_commits_only_the_user_turn() {
    let provider = ScriptedProvider::new(vec![Err(SysmateError::Provider(
        "gemini API error (503): overloaded".to_string(),
    ))]);
    let mut orch = orchestrator(10);
    let before = orch.history().len();

    let err = orch
        .send_message(&provider, "is my disk full?", None)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(orch.history().len(), before + 1);
    assert_eq!(turn_kinds(&orch), vec!["user"]);
}

#[tokio::test]
async fn transport_failure_mid_rounds_drops_staged_turns() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_call_reply(&[("call_0", "get_cpu_usage", json!({}))])),
        Err(SysmateError::Provider("connection reset".to_string())),
    ]);
    let mut orch = orchestrator(10);

    let err = orch
        .send_message(&provider, "how busy is the cpu?", None)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    // The tool ran, but its turns were never committed.
    assert_eq!(turn_kinds(&orch), vec!["user"]);
}

#[tokio::test]
async fn runaway_tool_calls_hit_the_round_limit() {
    let endless: Vec<Result<LlmResponse>> = (0..10)
        .map(|i| {
            Ok(tool_call_reply(&[(
                format!("call_{i}").as_str(),
                "get_cpu_usage",
                json!({}),
            )]))
        })
        .collect();
    let provider = ScriptedProvider::new(endless);
    let mut orch = orchestrator(3);

    let err = orch
        .send_message(&provider, "loop forever", None)
        .await
        .unwrap_err();

    assert!(matches!(err, SysmateError::RoundLimit(3)));
    assert_eq!(provider.request_count(), 3);
    // Fatal for this call: nothing beyond the user turn is committed.
    assert_eq!(turn_kinds(&orch), vec!["user"]);
}

#[tokio::test]
async fn unknown_tool_request_stays_conversational() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_call_reply(&[("call_0", "get_gpu_usage", json!({}))])),
        Ok(LlmResponse::text(
            "I can't check the GPU, but I can check CPU or memory.",
        )),
    ]);
    let mut orch = orchestrator(10);

    let answer = orch
        .send_message(&provider, "what's my gpu usage?", None)
        .await
        .unwrap();

    assert!(answer.contains("can't check the GPU"));

    // The failure reached the model as data, not as an aborted call.
    let second = provider.request(1);
    let tool_msg = second
        .messages
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_0"))
        .unwrap();
    let payload: Value = serde_json::from_str(tool_msg.content.as_ref().unwrap()).unwrap();
    assert_eq!(payload["success"], json!(false));
    assert!(
        payload["error"]
            .as_str()
            .unwrap()
            .contains("get_gpu_usage")
    );
}

#[tokio::test]
async fn clear_history_resets_the_session() {
    let provider = ScriptedProvider::new(vec![
        Ok(LlmResponse::text("Hello!")),
        Ok(LlmResponse::text("Fresh start.")),
    ]);
    let mut orch = orchestrator(10);

    orch.send_message(&provider, "hi", None).await.unwrap();
    assert_eq!(orch.history().len(), 2);

    orch.clear_history();
    assert!(orch.history().is_empty());

    orch.send_message(&provider, "hello again", None).await.unwrap();
    // Cleared history means the next request replays only the new turn.
    let last = provider.request(provider.request_count() - 1);
    let users = last
        .messages
        .iter()
        .filter(|m| matches!(m.role, sysmate_core::message::Role::User))
        .count();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn every_request_advertises_the_full_tool_set() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_call_reply(&[("call_0", "get_memory_usage", json!({}))])),
        Ok(LlmResponse::text("done")),
    ]);
    let mut orch = orchestrator(10);
    orch.send_message(&provider, "check memory", None).await.unwrap();

    for i in 0..provider.request_count() {
        let req = provider.request(i);
        let names: Vec<String> = req
            .tools
            .iter()
            .map(|t| t.function.name.clone())
            .collect();
        assert_eq!(names, vec!["get_memory_usage", "get_cpu_usage"]);
        // System instruction leads every request.
        assert!(matches!(
            req.messages[0].role,
            sysmate_core::message::Role::System
        ));
    }
}
