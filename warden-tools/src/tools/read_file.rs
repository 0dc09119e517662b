use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::tools::base::{parse_input, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;

const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Deserialize)]
struct ReadInput {
    filename: String,
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Reads a file from the sandbox"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {"type": "string"}
            },
            "required": ["filename"]
        })
    }

    fn max_calls(&self) -> u32 {
        10
    }

    async fn execute(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: ReadInput = parse_input(input)?;
        let target = ctx.sandbox.resolve(&input.filename)?;

        let metadata = match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Ok(json!({"error": "file_not_found", "filename": input.filename})),
        };
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ToolError::ValidationError("File too large".into()));
        }

        let content = fs::read_to_string(&target)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(json!({
            "filename": input.filename,
            "size": content.len(),
            "content": content,
        }))
    }
}
