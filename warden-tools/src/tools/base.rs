use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who owns a tool's capability contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerClass {
    System,
    Admin,
}

/// Immutable capability contract plus the tool body.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    fn owner(&self) -> OwnerClass {
        OwnerClass::System
    }
    fn side_effect(&self) -> bool {
        false
    }
    fn max_calls(&self) -> u32;
    fn max_seconds(&self) -> u64 {
        180
    }

    /// Runs the tool. The returned value is always a JSON object.
    async fn execute(&self, ctx: ExecutionContext, input: Value) -> Result<Value, ToolError>;
}

pub(crate) fn parse_input<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::ValidationError(e.to_string()))
}
