use crate::sandbox::SandboxBoundary;
use std::sync::Arc;

/// Everything a tool body may rely on besides its payload.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub agent_id: String,
    pub sandbox: Arc<SandboxBoundary>,
    pub timeout_ms: u64,
    pub call_ref: String,
}

impl ExecutionContext {
    pub fn new(
        run_id: String,
        agent_id: String,
        sandbox: Arc<SandboxBoundary>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            run_id,
            agent_id,
            sandbox,
            timeout_ms,
            call_ref: uuid::Uuid::new_v4().to_string(),
        }
    }
}
