#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use warden_infra::{BudgetLedger, MemoryEvidenceLog, RiskProfile, RiskScorer};
use warden_runtime::{AgentCatalog, ToolGateway, WorkflowOrchestrator};
use warden_tools::{
    register_builtin_tools, AuthDecision, Authorizer, ContentGuard, EvidenceSink,
    ExtractiveGenerator, SandboxBoundary, ToolRegistry,
};

pub const CATALOG: &str = "\
agents:
  - id: researcher
    allowed_tools: [search_docs, summarize_findings, read_file, list_files]
  - id: analyst
    allowed_tools: [check_policy, generate_report, read_file]
  - id: writer
    allowed_tools: [write_to_file, list_files]
";

pub const QUESTION: &str = "Summarize compliance state for project X";

/// Grants everything. Only used to prove that a wrongly granted call is caught.
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn decide(&self, _agent_id: &str, _tool_name: &str) -> AuthDecision {
        AuthDecision::Allow
    }
}

pub struct Stack {
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub log: Arc<MemoryEvidenceLog>,
    pub sandbox: PathBuf,
    _dir: TempDir,
}

pub fn catalog() -> AgentCatalog {
    AgentCatalog::parse(CATALOG).unwrap()
}

pub fn stack(authorizer: Arc<dyn Authorizer>, catalog: AgentCatalog) -> Stack {
    let log = Arc::new(MemoryEvidenceLog::new());
    stack_with_sink(authorizer, catalog, log.clone(), log)
}

pub fn stack_with_sink(
    authorizer: Arc<dyn Authorizer>,
    catalog: AgentCatalog,
    sink: Arc<dyn EvidenceSink>,
    log: Arc<MemoryEvidenceLog>,
) -> Stack {
    let dir = TempDir::new().unwrap();
    let sandbox = Arc::new(SandboxBoundary::new(dir.path().join("sandbox")).unwrap());

    let mut registry = ToolRegistry::new();
    register_builtin_tools(
        &mut registry,
        Arc::new(ExtractiveGenerator::default()),
        Arc::new(ContentGuard::default()),
        Duration::from_secs(5),
    )
    .unwrap();

    let scorer = Arc::new(RiskScorer::new(RiskProfile::default(), sink.clone()).unwrap());
    let gateway = ToolGateway::new(
        Arc::new(registry),
        authorizer,
        Arc::new(BudgetLedger::new()),
        scorer,
        sandbox.clone(),
        sink.clone(),
    );
    let orchestrator = WorkflowOrchestrator::new(gateway, catalog, sink);

    Stack {
        orchestrator: Arc::new(orchestrator),
        log,
        sandbox: sandbox.root().to_path_buf(),
        _dir: dir,
    }
}
