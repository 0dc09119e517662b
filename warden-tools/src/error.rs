use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an authorization check resolved to deny. All three are fail-closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The decision point answered without an explicit allow.
    PolicyDenied,
    /// The decision point could not be reached in time.
    DecisionPointUnavailable,
    /// The decision point answered with a non-success status or garbage.
    DecisionPointError,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::PolicyDenied => "policy_denied",
            DenialReason::DecisionPointUnavailable => "decision_point_unavailable",
            DenialReason::DecisionPointError => "decision_point_error",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("run {0} is not active")]
    RunNotActive(String),

    #[error("agent '{agent_id}' not allowed to use tool '{tool_name}' ({reason}): {detail}")]
    UnauthorizedTool {
        agent_id: String,
        tool_name: String,
        reason: DenialReason,
        detail: String,
    },

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("path traversal blocked: {0}")]
    PathTraversal(String),

    #[error("exfiltration detected: pattern '{pattern}' found in {tool_name} content")]
    ExfiltrationDetected { tool_name: String, pattern: String },

    #[error("risk score {score} blocked call to {tool_name}")]
    RiskBlocked { tool_name: String, score: u8 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Internal error")]
    Internal,
}

impl ToolError {
    /// Stable snake_case tag used in evidence records.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::ToolNotFound(_) => "tool_not_found",
            ToolError::RunNotActive(_) => "run_not_active",
            ToolError::UnauthorizedTool { .. } => "unauthorized_tool",
            ToolError::SchemaViolation(_) => "schema_violation",
            ToolError::BudgetExceeded(_) => "budget_exceeded",
            ToolError::PathTraversal(_) => "path_traversal",
            ToolError::ExfiltrationDetected { .. } => "exfiltration_detected",
            ToolError::RiskBlocked { .. } => "risk_blocked",
            ToolError::ValidationError(_) => "validation_error",
            ToolError::ExecutionFailed(_) => "execution_failed",
            ToolError::Timeout => "timeout",
            ToolError::Internal => "internal",
        }
    }

    /// True when a security control stopped the call, as opposed to a
    /// technical failure.
    pub fn is_security_block(&self) -> bool {
        matches!(
            self,
            ToolError::UnauthorizedTool { .. }
                | ToolError::PathTraversal(_)
                | ToolError::ExfiltrationDetected { .. }
                | ToolError::RiskBlocked { .. }
        )
    }

    /// Violations raised by a tool body after execution started. These still
    /// count toward the run budget.
    pub fn is_in_tool_violation(&self) -> bool {
        matches!(
            self,
            ToolError::ExfiltrationDetected { .. } | ToolError::PathTraversal(_)
        )
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            ToolError::UnauthorizedTool { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
