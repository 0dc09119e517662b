use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::tools::base::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;

const MAX_ENTRIES: usize = 1000;

/// Lists regular files directly under the sandbox root.
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "Lists files in the sandbox"
    }

    fn schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn max_calls(&self) -> u32 {
        10
    }

    async fn execute(&self, ctx: ExecutionContext, _input: Value) -> Result<Value, ToolError> {
        let mut files = Vec::new();
        let mut dir = fs::read_dir(ctx.sandbox.root())
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
        {
            if files.len() >= MAX_ENTRIES {
                break;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
            if !metadata.is_file() {
                continue;
            }
            files.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "size": metadata.len(),
            }));
        }

        files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        Ok(json!({"count": files.len(), "files": files}))
    }
}
