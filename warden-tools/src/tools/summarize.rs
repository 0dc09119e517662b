use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::generator::{bounded, TextGenerator};
use crate::tools::base::{parse_input, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct SummarizeInput {
    text: String,
}

pub struct SummarizeFindingsTool {
    generator: Arc<dyn TextGenerator>,
    generation_timeout: Duration,
}

impl SummarizeFindingsTool {
    pub fn new(generator: Arc<dyn TextGenerator>, generation_timeout: Duration) -> Self {
        Self {
            generator,
            generation_timeout,
        }
    }
}

#[async_trait]
impl Tool for SummarizeFindingsTool {
    fn name(&self) -> &'static str {
        "summarize_findings"
    }

    fn description(&self) -> &'static str {
        "Summarizes research findings"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"}
            },
            "required": ["text"]
        })
    }

    fn max_calls(&self) -> u32 {
        5
    }

    async fn execute(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: SummarizeInput = parse_input(input)?;
        if input.text.trim().is_empty() {
            return Ok(json!({"summary": "No content to summarize", "status": "empty"}));
        }

        let summary = bounded(self.generation_timeout, self.generator.summarize(&input.text)).await?;

        Ok(json!({
            "summary": summary,
            "input_length": input.text.len(),
            "status": "success",
        }))
    }
}
