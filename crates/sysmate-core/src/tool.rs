//! Tool system — the static catalog of capabilities the model can call.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SysmateError};
use crate::provider::{FunctionDefinition, ToolDefinition};

/// Abstract tool trait — one implementation per callable capability.
///
/// Tools return structured data (`serde_json::Value`); the dispatcher
/// wraps it into the uniform result envelope before it reaches the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls. Unique within a registry.
    fn name(&self) -> &str;

    /// Description of what the tool does, consumed by the model.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with given arguments.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Convert to function-calling definition format.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(),
            },
        }
    }
}

/// Registry of callable tools, kept in registration order so the
/// capability surface advertised to the model is stable across rounds.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a new tool. Re-registering a name replaces the old entry.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        tracing::debug!("Registered tool: {}", name);
        self.tools.retain(|t| t.name() != name);
        self.tools.push(Box::new(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All tool definitions for model function calling, in registration
    /// order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Check that every argument the tool's schema marks `required` is
    /// present. Values are not deep type-checked — that stays with the
    /// tool itself.
    pub fn validate(&self, name: &str, args: &Value) -> Result<()> {
        let tool = self
            .get(name)
            .ok_or_else(|| SysmateError::ToolNotFound(name.to_string()))?;

        let schema = tool.parameters();
        let required = match schema.get("required").and_then(|r| r.as_array()) {
            Some(r) => r,
            None => return Ok(()),
        };

        let missing: Vec<&str> = required
            .iter()
            .filter_map(|k| k.as_str())
            .filter(|k| args.get(*k).map_or(true, |v| v.is_null()))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SysmateError::Schema(format!(
                "missing required argument(s) for {}: {}",
                name,
                missing.join(", ")
            )))
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo a message back"
        }
        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"]
            })
        }
        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(json!({ "echo": args["message"] }))
        }
    }

    struct NoArgsTool;

    #[async_trait]
    impl Tool for NoArgsTool {
        fn name(&self) -> &str {
            "no_args"
        }
        fn description(&self) -> &str {
            "Takes nothing"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object", "properties": {}, "required": [] })
        }
        async fn execute(&self, _args: Value) -> Result<Value> {
            Ok(json!({ "ok": true }))
        }
    }

    #[test]
    fn definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(NoArgsTool);

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].function.name, "echo");
        assert_eq!(defs[1].function.name, "no_args");
        assert_eq!(registry.names(), vec!["echo", "no_args"]);
    }

    #[test]
    fn validate_detects_missing_required_argument() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        assert!(registry.validate("echo", &json!({ "message": "hi" })).is_ok());

        let err = registry.validate("echo", &json!({})).unwrap_err();
        match err {
            SysmateError::Schema(msg) => assert!(msg.contains("message")),
            other => panic!("expected Schema error, got {other:?}"),
        }

        // Explicit null counts as missing.
        assert!(registry.validate("echo", &json!({ "message": null })).is_err());
    }

    #[test]
    fn validate_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.validate("nope", &json!({})),
            Err(SysmateError::ToolNotFound(_))
        ));
    }

    #[test]
    fn empty_required_list_accepts_anything() {
        let mut registry = ToolRegistry::new();
        registry.register(NoArgsTool);
        assert!(registry.validate("no_args", &json!({})).is_ok());
        assert!(registry.validate("no_args", &json!({ "extra": 1 })).is_ok());
    }
}
