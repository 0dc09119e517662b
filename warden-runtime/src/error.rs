//! Workflow-level errors.

use thiserror::Error;
use warden_tools::ToolError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Catalog validation failed: {0}")]
    CatalogValidation(String),

    #[error("CRITICAL: {0}")]
    CriticalInvariantViolation(String),

    #[error("Workflow terminated: {0}")]
    WorkflowTerminated(String),

    #[error("Run {0} is terminal; no further tool calls permitted")]
    RunTerminated(String),

    #[error("Invalid transition for run {run_id}: {from} -> {to}")]
    InvalidTransition {
        run_id: String,
        from: String,
        to: String,
    },

    #[error("Concurrency error: {0}")]
    Concurrency(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Security controls that abort the remaining pipeline (`Blocked`).
    /// Everything else is a technical failure (`Failed`).
    pub fn terminates_workflow(&self) -> bool {
        match self {
            WorkflowError::Tool(e) => matches!(
                e,
                ToolError::UnauthorizedTool { .. } | ToolError::ExfiltrationDetected { .. }
            ),
            WorkflowError::WorkflowTerminated(_) => true,
            _ => false,
        }
    }

    /// "Blocked by a security control" as opposed to a technical failure.
    pub fn is_security_block(&self) -> bool {
        match self {
            WorkflowError::Tool(e) => e.is_security_block(),
            WorkflowError::WorkflowTerminated(_) => true,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Tool(e) => e.kind(),
            WorkflowError::CatalogValidation(_) => "catalog_validation",
            WorkflowError::CriticalInvariantViolation(_) => "critical_invariant_violation",
            WorkflowError::WorkflowTerminated(_) => "workflow_terminated",
            WorkflowError::RunTerminated(_) => "run_terminated",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::Concurrency(_) => "concurrency",
            WorkflowError::Config(_) => "config",
            WorkflowError::Io(_) => "io",
            WorkflowError::Serialization(_) => "serialization",
        }
    }
}
