//! Composition root: builds every service from configuration.

use crate::cli::AuthorizerMode;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use warden_infra::{BudgetLedger, JsonlEvidenceLog, PolicyDecisionClient, RiskScorer};
use warden_runtime::{AgentCatalog, CatalogAuthorizer, ToolGateway, WardenConfig, WorkflowOrchestrator};
use warden_tools::{
    register_builtin_tools, Authorizer, ContentGuard, EvidenceSink, ExtractiveGenerator,
    SandboxBoundary, ToolRegistry,
};

pub struct Services {
    pub orchestrator: WorkflowOrchestrator,
    pub pdp: Arc<PolicyDecisionClient>,
    pub evidence: Arc<JsonlEvidenceLog>,
}

pub fn build(config: &WardenConfig, mode: AuthorizerMode) -> Result<Services> {
    let evidence = Arc::new(
        JsonlEvidenceLog::new(&config.evidence_log).with_context(|| {
            format!("Failed to open evidence log {}", config.evidence_log.display())
        })?,
    );
    let sink: Arc<dyn EvidenceSink> = evidence.clone();

    let sandbox = Arc::new(
        SandboxBoundary::new(&config.sandbox_dir)
            .with_context(|| format!("Failed to prepare sandbox {}", config.sandbox_dir.display()))?,
    );

    let guard = Arc::new(
        ContentGuard::new(&config.content_guard.patterns).context("Invalid content guard pattern")?,
    );
    let mut registry = ToolRegistry::new();
    register_builtin_tools(
        &mut registry,
        Arc::new(ExtractiveGenerator::default()),
        guard,
        config.execution.generation_timeout(),
    )
    .context("Failed to register tools")?;
    info!("Registered {} tools: {}", registry.count(), registry.list().join(", "));

    let pdp = Arc::new(
        PolicyDecisionClient::new(
            config.pdp.tool_url.clone(),
            config.pdp.request_url.clone(),
            config.pdp.timeout(),
        )
        .context("Failed to build policy decision client")?,
    );

    let catalog = AgentCatalog::load(&config.catalog_path);
    let authorizer: Arc<dyn Authorizer> = match mode {
        AuthorizerMode::Pdp => pdp.clone(),
        AuthorizerMode::Catalog => Arc::new(CatalogAuthorizer::new(catalog.clone())),
    };

    let scorer = Arc::new(
        RiskScorer::new(config.risk.clone(), sink.clone()).context("Invalid risk profile")?,
    );
    let gateway = ToolGateway::new(
        Arc::new(registry),
        authorizer,
        Arc::new(BudgetLedger::with_ceiling(config.budget.run_ceiling())),
        scorer,
        sandbox,
        sink.clone(),
    )
    .with_tool_timeout(config.execution.tool_timeout());

    let orchestrator = WorkflowOrchestrator::with_max_concurrent_runs(
        gateway,
        catalog,
        sink,
        config.max_concurrent_runs,
    );

    Ok(Services {
        orchestrator,
        pdp,
        evidence,
    })
}
