use crate::error::ToolError;
use crate::tools::Tool;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered tool together with its compiled input schema.
#[derive(Clone)]
pub struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Arc<Validator>,
}

impl RegisteredTool {
    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    pub fn name(&self) -> &'static str {
        self.tool.name()
    }

    /// Checks a payload against the tool's structural contract.
    pub fn validate(&self, payload: &Value) -> Result<(), ToolError> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(payload)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ToolError::SchemaViolation(messages.join("; ")))
        }
    }
}

/// Name-keyed store of tool contracts. Entries are immutable once stored;
/// registering the same name again replaces the previous definition.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<&mut Self, ToolError> {
        let schema = tool.schema();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|e| {
                ToolError::ValidationError(format!("invalid schema for {}: {}", tool.name(), e))
            })?;

        self.tools.insert(
            tool.name().to_string(),
            RegisteredTool {
                tool,
                validator: Arc::new(validator),
            },
        );
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Result<RegisteredTool, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}
