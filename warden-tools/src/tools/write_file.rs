use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::sandbox::ContentGuard;
use crate::tools::base::{parse_input, OwnerClass, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Deserialize)]
struct WriteInput {
    filename: String,
    content: String,
}

pub struct WriteToFileTool {
    guard: Arc<ContentGuard>,
}

impl WriteToFileTool {
    pub fn new(guard: Arc<ContentGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl Tool for WriteToFileTool {
    fn name(&self) -> &'static str {
        "write_to_file"
    }

    fn description(&self) -> &'static str {
        "Writes content to a file in the sandbox"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["filename", "content"]
        })
    }

    fn owner(&self) -> OwnerClass {
        OwnerClass::Admin
    }

    fn side_effect(&self) -> bool {
        true
    }

    fn max_calls(&self) -> u32 {
        3
    }

    async fn execute(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: WriteInput = parse_input(input)?;
        if input.filename.trim().is_empty() {
            return Err(ToolError::ValidationError("filename_required".into()));
        }

        self.guard.check(self.name(), &input.content)?;
        let target = ctx.sandbox.resolve(&input.filename)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        }

        let mut temp_name = target.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        if let Err(e) = write_then_rename(&temp_path, &target, input.content.as_bytes()).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                debug!("Could not remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(ToolError::ExecutionFailed(e.to_string()));
        }

        Ok(json!({
            "path": target.to_string_lossy(),
            "filename": input.filename,
            "bytes_written": input.content.len(),
            "status": "written",
        }))
    }
}

async fn write_then_rename(temp_path: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    fs::rename(temp_path, target).await
}
