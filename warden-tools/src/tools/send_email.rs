use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::sandbox::ContentGuard;
use crate::tools::base::{parse_input, OwnerClass, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
struct EmailInput {
    to: String,
    subject: String,
    body: String,
}

/// Simulated outbound message. Nothing leaves the process.
pub struct SendEmailTool {
    guard: Arc<ContentGuard>,
}

impl SendEmailTool {
    pub fn new(guard: Arc<ContentGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &'static str {
        "send_email"
    }

    fn description(&self) -> &'static str {
        "Sends an email (simulated)"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "string"},
                "subject": {"type": "string"},
                "body": {"type": "string"}
            },
            "required": ["to", "subject", "body"]
        })
    }

    fn owner(&self) -> OwnerClass {
        OwnerClass::Admin
    }

    fn side_effect(&self) -> bool {
        true
    }

    fn max_calls(&self) -> u32 {
        1
    }

    async fn execute(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: EmailInput = parse_input(input)?;
        self.guard.check(self.name(), &input.to)?;
        self.guard.check(self.name(), &input.body)?;

        warn!("Simulated email send in run {} to {}", ctx.run_id, input.to);
        Ok(json!({
            "status": "simulated_send",
            "to": input.to,
            "subject": input.subject,
        }))
    }
}
