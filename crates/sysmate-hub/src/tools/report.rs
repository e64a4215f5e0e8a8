//! The `store_in_file` tool — persists a model-written report through a
//! [`ReportStore`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use sysmate_core::error::{Result, SysmateError};
use sysmate_core::tool::Tool;

use crate::report::ReportStore;

const MISSING_ARGS: &str = "fileName and content are required";

pub struct StoreInFileTool {
    store: Arc<dyn ReportStore>,
}

impl StoreInFileTool {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for StoreInFileTool {
    fn name(&self) -> &str {
        "store_in_file"
    }

    fn description(&self) -> &str {
        "Save a report or any text content to a file in the reports directory"
    }

    fn parameters(&self) -> Value {
        // Argument presence is checked in execute so the failure message
        // stays stable for the model; the schema stays descriptive.
        json!({
            "type": "object",
            "properties": {
                "fileName": {
                    "type": "string",
                    "description": "Name for the report file, e.g. 'cpu-report.md'. Required."
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write. Required."
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_name = args.get("fileName").and_then(|v| v.as_str());
        let content = args.get("content").and_then(|v| v.as_str());

        let (file_name, content) = match (file_name, content) {
            (Some(n), Some(c)) if !n.is_empty() && !c.is_empty() => (n, c),
            _ => return Err(SysmateError::Other(MISSING_ARGS.to_string())),
        };

        let receipt = self.store.write_report(file_name, content).await?;
        Ok(json!({
            "message": format!("Report saved as {}", receipt.file_name),
            "path": receipt.path,
            "fileName": receipt.file_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportReceipt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                writes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReportStore for CountingStore {
        async fn write_report(&self, name: &str, _content: &str) -> Result<ReportReceipt> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(ReportReceipt {
                path: format!("reports/{}", name),
                file_name: name.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn missing_arguments_never_reach_the_store() {
        let store = CountingStore::new();
        let tool = StoreInFileTool::new(store.clone());

        for args in [
            json!({}),
            json!({ "fileName": "report.txt" }),
            json!({ "content": "hello" }),
            json!({ "fileName": "", "content": "hello" }),
            json!({ "fileName": null, "content": "hello" }),
        ] {
            let err = tool.execute(args).await.unwrap_err();
            assert_eq!(err.to_string(), "fileName and content are required");
        }

        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_arguments_produce_a_receipt() {
        let store = CountingStore::new();
        let tool = StoreInFileTool::new(store.clone());

        let value = tool
            .execute(json!({ "fileName": "disk.md", "content": "# Disk" }))
            .await
            .unwrap();

        assert_eq!(value["fileName"], json!("disk.md"));
        assert!(value["message"].as_str().unwrap().contains("disk.md"));
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }
}
