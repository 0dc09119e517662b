use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::generator::{bounded, TextGenerator};
use crate::sandbox::ContentGuard;
use crate::tools::base::{parse_input, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct ReportInput {
    title: String,
    body: String,
}

pub struct GenerateReportTool {
    generator: Arc<dyn TextGenerator>,
    guard: Arc<ContentGuard>,
    generation_timeout: Duration,
}

impl GenerateReportTool {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        guard: Arc<ContentGuard>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            guard,
            generation_timeout,
        }
    }
}

#[async_trait]
impl Tool for GenerateReportTool {
    fn name(&self) -> &'static str {
        "generate_report"
    }

    fn description(&self) -> &'static str {
        "Generates a formatted report"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "body": {"type": "string"}
            },
            "required": ["title", "body"]
        })
    }

    fn max_calls(&self) -> u32 {
        5
    }

    async fn execute(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: ReportInput = parse_input(input)?;

        // Must run before any generation call sees the body.
        self.guard.check(self.name(), &input.body)?;

        let report = bounded(
            self.generation_timeout,
            self.generator.compose_report(&input.title, &input.body),
        )
        .await?;

        Ok(json!({
            "report": report,
            "title": input.title,
            "status": "generated",
        }))
    }
}
