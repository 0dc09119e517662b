use crate::error::DenialReason;
use async_trait::async_trait;

/// Authorization decision for an agent/tool pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny { reason: DenialReason, detail: String },
}

impl AuthDecision {
    pub fn deny(reason: DenialReason, detail: impl Into<String>) -> Self {
        AuthDecision::Deny {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, AuthDecision::Allow)
    }
}

/// Delegate for the tool-level authorization decision. Implementations must
/// fail closed: anything other than an explicit allow is a `Deny`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn decide(&self, agent_id: &str, tool_name: &str) -> AuthDecision;
}
