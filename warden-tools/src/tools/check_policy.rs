use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::tools::base::{parse_input, Tool};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct PolicyInput {
    policy: String,
}

/// Informational compliance lookup. Never blocks the caller; an unknown or
/// restricted policy simply reports `ok: false`.
pub struct CheckPolicyTool;

#[async_trait]
impl Tool for CheckPolicyTool {
    fn name(&self) -> &'static str {
        "check_policy"
    }

    fn description(&self) -> &'static str {
        "Checks a named compliance policy"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "policy": {"type": "string"}
            },
            "required": ["policy"]
        })
    }

    fn max_calls(&self) -> u32 {
        10
    }

    async fn execute(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
        let input: PolicyInput = parse_input(input)?;
        let (ok, message) = match input.policy.as_str() {
            "compliance_v1" => (true, "Compliance policy v1 validated"),
            "security_v1" => (true, "Security policy v1 validated"),
            "restricted" => (false, "Access denied by policy"),
            _ => (false, "Unknown policy"),
        };
        Ok(json!({"policy": input.policy, "ok": ok, "message": message}))
    }
}
