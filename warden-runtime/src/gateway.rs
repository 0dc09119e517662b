//! Tool-call gateway: the single governed path from an agent to a tool.

use crate::run::RunBook;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use warden_infra::{
    BudgetLedger, BudgetPermit, RiskAction, RiskAssessment, RiskScorer, RunUsage, ToolCallRecord,
};
use warden_tools::{
    AuthDecision, Authorizer, DenialReason, EvidenceEvent, EvidenceSink, ExecutionContext,
    RegisteredTool, SandboxBoundary, ToolError, ToolRegistry,
};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct ToolGateway {
    registry: Arc<ToolRegistry>,
    authorizer: Arc<dyn Authorizer>,
    ledger: Arc<BudgetLedger>,
    scorer: Arc<RiskScorer>,
    sandbox: Arc<SandboxBoundary>,
    sink: Arc<dyn EvidenceSink>,
    runs: Option<Arc<RunBook>>,
    tool_timeout: Duration,
    enforce_risk: bool,
}

impl ToolGateway {
    pub fn new(
        registry: Arc<ToolRegistry>,
        authorizer: Arc<dyn Authorizer>,
        ledger: Arc<BudgetLedger>,
        scorer: Arc<RiskScorer>,
        sandbox: Arc<SandboxBoundary>,
        sink: Arc<dyn EvidenceSink>,
    ) -> Self {
        let enforce_risk = scorer.profile().enforce;
        Self {
            registry,
            authorizer,
            ledger,
            scorer,
            sandbox,
            sink,
            runs: None,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            enforce_risk,
        }
    }

    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    /// Only runs open and live in `runs` may call tools once a book is attached.
    pub fn with_run_book(mut self, runs: Arc<RunBook>) -> Self {
        self.runs = Some(runs);
        self
    }

    pub fn sandbox(&self) -> &SandboxBoundary {
        &self.sandbox
    }

    pub fn usage(&self, run_id: &str) -> RunUsage {
        self.ledger.usage(run_id)
    }

    /// Runs one tool call through lookup, authorization, schema and budget
    /// checks, in that order, then executes it. Nothing before execution
    /// touches external state.
    pub async fn call(
        &self,
        tool_name: &str,
        agent_id: &str,
        run_id: &str,
        payload: Value,
    ) -> Result<Value, ToolError> {
        info!("Gateway call: {} by {} in run {}", tool_name, agent_id, run_id);

        if let Some(runs) = &self.runs {
            if let Err(e) = runs.ensure_active(run_id) {
                warn!("{} called {} on inactive run: {}", agent_id, tool_name, e);
                let err = ToolError::RunNotActive(run_id.to_string());
                self.deny_event("run_not_active", run_id, agent_id, tool_name, &err);
                return Err(err);
            }
        }

        // 1. Lookup
        let tool = match self.registry.lookup(tool_name) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Unknown tool requested: {}", tool_name);
                self.deny_event("tool_not_found", run_id, agent_id, tool_name, &e);
                return Err(e);
            }
        };

        // 2. Authorization
        if let AuthDecision::Deny { reason, detail } =
            self.authorizer.decide(agent_id, tool_name).await
        {
            self.scorer.assess(agent_id, tool_name, &payload, run_id, false);
            warn!("{} denied {} ({}): {}", agent_id, tool_name, reason, detail);
            let event_type = match reason {
                DenialReason::PolicyDenied => "unauthorized_tool_attempt",
                DenialReason::DecisionPointUnavailable => "decision_point_unavailable",
                DenialReason::DecisionPointError => "decision_point_error",
            };
            self.sink.record(
                EvidenceEvent::new(event_type, run_id)
                    .with("agent_id", agent_id)
                    .with("tool", tool_name)
                    .with("blocked", true)
                    .with("reason", reason.as_str())
                    .with("detail", detail.as_str()),
            );
            return Err(ToolError::UnauthorizedTool {
                agent_id: agent_id.to_string(),
                tool_name: tool_name.to_string(),
                reason,
                detail,
            });
        }

        let assessment = self.scorer.assess(agent_id, tool_name, &payload, run_id, true);

        // 3. Schema
        if let Err(e) = tool.validate(&payload) {
            self.deny_event("schema_violation", run_id, agent_id, tool_name, &e);
            return Err(e);
        }

        // 4. Budget
        let permit = match self.ledger.check(&**tool.tool(), run_id) {
            Ok(permit) => permit,
            Err(e) => {
                self.deny_event("budget_exceeded", run_id, agent_id, tool_name, &e);
                return Err(e);
            }
        };

        if self.enforce_risk && assessment.action == RiskAction::Block {
            return Err(self.risk_block(&assessment));
        }

        self.scorer.record_call(run_id, tool_name);

        // 5. Execute, 6. Record
        self.execute(&tool, permit, run_id, agent_id, payload).await
    }

    /// Spawns the tool body and its settlement together. A timeout stops the
    /// caller from waiting; the task keeps the budget permit and records the
    /// outcome whenever the tool finishes.
    async fn execute(
        &self,
        tool: &RegisteredTool,
        permit: BudgetPermit,
        run_id: &str,
        agent_id: &str,
        payload: Value,
    ) -> Result<Value, ToolError> {
        let limit = self
            .tool_timeout
            .min(Duration::from_secs(tool.tool().max_seconds()));
        let ctx = ExecutionContext::new(
            run_id.to_string(),
            agent_id.to_string(),
            Arc::clone(&self.sandbox),
            limit.as_millis() as u64,
        );
        let settlement = Settlement {
            ledger: Arc::clone(&self.ledger),
            sink: Arc::clone(&self.sink),
            run_id: run_id.to_string(),
            agent_id: agent_id.to_string(),
            tool_name: tool.tool().name().to_string(),
            call_ref: ctx.call_ref.clone(),
            payload: payload.clone(),
        };
        let tool_name = settlement.tool_name.clone();
        let call_ref = ctx.call_ref.clone();
        let tool = Arc::clone(tool.tool());

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            // Inner task so a panicking tool still gets settled.
            let outcome = match tokio::spawn(async move { tool.execute(ctx, payload).await }).await {
                Ok(result) => result,
                Err(join_err) => {
                    if join_err.is_panic() {
                        error!("Tool execution panicked");
                    } else {
                        error!("Tool execution cancelled");
                    }
                    Err(ToolError::Internal)
                }
            };
            settlement.finish(permit, started.elapsed(), outcome)
        });

        match timeout(limit, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                error!("Tool settlement task failed: {}", join_err);
                Err(ToolError::Internal)
            }
            Err(_) => {
                warn!(
                    "{} timed out after {}ms; still running as {}",
                    tool_name,
                    limit.as_millis(),
                    call_ref
                );
                self.sink.record(
                    error_event("tool_call_timeout", run_id, agent_id, &tool_name, &ToolError::Timeout)
                        .with("call_ref", call_ref.as_str())
                        .with("limit_ms", limit.as_millis() as u64),
                );
                Err(ToolError::Timeout)
            }
        }
    }

    fn risk_block(&self, assessment: &RiskAssessment) -> ToolError {
        warn!(
            "Risk enforcement blocked {} (score {})",
            assessment.tool_name, assessment.risk_score
        );
        self.sink.record(
            EvidenceEvent::new("risk_block", &assessment.run_id)
                .with("agent_id", assessment.agent_id.as_str())
                .with("tool", assessment.tool_name.as_str())
                .with("risk_score", assessment.risk_score)
                .with("reasons", json!(assessment.reasons)),
        );
        ToolError::RiskBlocked {
            tool_name: assessment.tool_name.clone(),
            score: assessment.risk_score,
        }
    }

    fn deny_event(
        &self,
        event_type: &str,
        run_id: &str,
        agent_id: &str,
        tool_name: &str,
        err: &ToolError,
    ) {
        self.sink
            .record(error_event(event_type, run_id, agent_id, tool_name, err).with("blocked", true));
    }
}

/// Accounting for one started execution, applied when the tool finishes.
struct Settlement {
    ledger: Arc<BudgetLedger>,
    sink: Arc<dyn EvidenceSink>,
    run_id: String,
    agent_id: String,
    tool_name: String,
    call_ref: String,
    payload: Value,
}

impl Settlement {
    fn finish(
        self,
        permit: BudgetPermit,
        elapsed: Duration,
        outcome: Result<Value, ToolError>,
    ) -> Result<Value, ToolError> {
        let (run_id, agent_id, tool_name) = (&self.run_id, &self.agent_id, &self.tool_name);
        match outcome {
            Ok(result) => {
                self.ledger.record(permit, elapsed);
                let record = ToolCallRecord::success(
                    run_id,
                    agent_id,
                    tool_name,
                    self.payload.clone(),
                    result.clone(),
                    elapsed.as_secs_f64(),
                );
                self.sink
                    .record(record.to_event().with("call_ref", self.call_ref.as_str()));
                debug!("{} completed in {:.3}s", tool_name, elapsed.as_secs_f64());
                Ok(result)
            }
            Err(e) if e.is_in_tool_violation() => {
                // attempted: counts toward the run budget
                self.ledger.record(permit, elapsed);
                warn!("{} blocked inside tool: {}", tool_name, e);
                self.sink.record(
                    error_event("tool_call_blocked", run_id, agent_id, tool_name, &e)
                        .with("call_ref", self.call_ref.as_str())
                        .with("elapsed", elapsed.as_secs_f64()),
                );
                Err(e)
            }
            Err(e) => {
                drop(permit);
                warn!("{} failed: {}", tool_name, e);
                self.sink.record(
                    error_event("tool_call_failed", run_id, agent_id, tool_name, &e)
                        .with("call_ref", self.call_ref.as_str())
                        .with("elapsed", elapsed.as_secs_f64()),
                );
                Err(e)
            }
        }
    }
}

fn error_event(
    event_type: &str,
    run_id: &str,
    agent_id: &str,
    tool_name: &str,
    err: &ToolError,
) -> EvidenceEvent {
    EvidenceEvent::new(event_type, run_id)
        .with("agent_id", agent_id)
        .with("tool", tool_name)
        .with("kind", err.kind())
        .with("error", err.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::run::{RunState, Scenario};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use warden_infra::{MemoryEvidenceLog, RiskProfile};
    use warden_tools::Tool;

    struct AllowAll;

    #[async_trait]
    impl Authorizer for AllowAll {
        async fn decide(&self, _agent_id: &str, _tool_name: &str) -> AuthDecision {
            AuthDecision::Allow
        }
    }

    struct DenyAll(DenialReason);

    #[async_trait]
    impl Authorizer for DenyAll {
        async fn decide(&self, _agent_id: &str, _tool_name: &str) -> AuthDecision {
            AuthDecision::deny(self.0, "test")
        }
    }

    /// Counts executions; panics or sleeps on request.
    struct Echo {
        runs: Arc<AtomicUsize>,
        sleep: Option<Duration>,
        panic: bool,
    }

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "test echo tool"
        }

        fn schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        fn max_calls(&self) -> u32 {
            2
        }

        async fn execute(&self, _ctx: ExecutionContext, input: Value) -> Result<Value, ToolError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.sleep {
                tokio::time::sleep(d).await;
            }
            if self.panic {
                panic!("echo panic");
            }
            Ok(json!({"echo": input["text"]}))
        }
    }

    struct Harness {
        gateway: ToolGateway,
        log: Arc<MemoryEvidenceLog>,
        runs: Arc<AtomicUsize>,
        _dir: TempDir,
    }

    fn harness(authorizer: Arc<dyn Authorizer>, tool_sleep: Option<Duration>, panic: bool) -> Harness {
        harness_with(authorizer, tool_sleep, panic, RiskProfile::default())
    }

    fn harness_with(
        authorizer: Arc<dyn Authorizer>,
        tool_sleep: Option<Duration>,
        panic: bool,
        profile: RiskProfile,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(Echo {
                runs: runs.clone(),
                sleep: tool_sleep,
                panic,
            }))
            .unwrap();

        let log = Arc::new(MemoryEvidenceLog::new());
        let scorer = Arc::new(RiskScorer::new(profile, log.clone()).unwrap());
        let gateway = ToolGateway::new(
            Arc::new(registry),
            authorizer,
            Arc::new(BudgetLedger::new()),
            scorer,
            Arc::new(SandboxBoundary::new(dir.path()).unwrap()),
            log.clone(),
        );
        Harness {
            gateway,
            log,
            runs,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_success_records_call_and_assessment() {
        let h = harness(Arc::new(AllowAll), None, false);
        let out = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"text": "hi"}))
            .await
            .unwrap();

        assert_eq!(out, json!({"echo": "hi"}));
        assert_eq!(h.log.count("run-1", "tool_call"), 1);
        assert_eq!(h.log.count("run-1", "risk_assessment"), 1);
        assert_eq!(h.gateway.usage("run-1").calls_for("echo"), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let h = harness(Arc::new(AllowAll), None, false);
        let err = h
            .gateway
            .call("nope", "researcher", "run-1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolNotFound(_)));
        assert_eq!(h.log.count("run-1", "tool_not_found"), 1);
        assert_eq!(h.log.count("run-1", "risk_assessment"), 0);
    }

    #[tokio::test]
    async fn test_denial_precedes_schema_check() {
        let h = harness(Arc::new(DenyAll(DenialReason::PolicyDenied)), None, false);
        // invalid payload, but authorization must answer first
        let err = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"wrong": 1}))
            .await
            .unwrap_err();

        assert_eq!(err.denial_reason(), Some(DenialReason::PolicyDenied));
        assert_eq!(h.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.log.count("run-1", "unauthorized_tool_attempt"), 1);
        assert_eq!(h.log.count("run-1", "schema_violation"), 0);
        assert_eq!(h.log.count("run-1", "tool_call"), 0);

        let assessment = &h.log.of_type("run-1", "risk_assessment")[0];
        assert_eq!(assessment.field("risk_score"), Some(&json!(100)));
        assert_eq!(h.gateway.usage("run-1"), RunUsage::default());
    }

    #[tokio::test]
    async fn test_denial_categories_map_to_event_types() {
        for (reason, event_type) in [
            (DenialReason::DecisionPointUnavailable, "decision_point_unavailable"),
            (DenialReason::DecisionPointError, "decision_point_error"),
        ] {
            let h = harness(Arc::new(DenyAll(reason)), None, false);
            let err = h
                .gateway
                .call("echo", "researcher", "run-1", json!({"text": "hi"}))
                .await
                .unwrap_err();
            assert_eq!(err.denial_reason(), Some(reason));
            assert_eq!(h.log.count("run-1", event_type), 1);
        }
    }

    #[tokio::test]
    async fn test_schema_violation_does_not_execute() {
        let h = harness(Arc::new(AllowAll), None, false);
        let err = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"text": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation(_)));
        assert_eq!(h.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.gateway.usage("run-1").calls_for("echo"), 0);
    }

    #[tokio::test]
    async fn test_budget_exhaustion() {
        let h = harness(Arc::new(AllowAll), None, false);
        for _ in 0..2 {
            h.gateway
                .call("echo", "researcher", "run-1", json!({"text": "x"}))
                .await
                .unwrap();
        }
        let err = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"text": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::BudgetExceeded(msg) if msg.contains("max_calls_exceeded:echo")));
        assert_eq!(h.runs.load(Ordering::SeqCst), 2);
        assert_eq!(h.log.count("run-1", "tool_call"), 2);
        assert_eq!(h.log.count("run-1", "budget_exceeded"), 1);
        // separate run, separate budget
        assert!(h
            .gateway
            .call("echo", "researcher", "run-2", json!({"text": "x"}))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_timed_out_calls_hold_their_budget_slot() {
        let h = harness(Arc::new(AllowAll), Some(Duration::from_millis(300)), false);
        let gateway = h.gateway.with_tool_timeout(Duration::from_millis(20));

        for _ in 0..2 {
            let err = gateway
                .call("echo", "researcher", "run-1", json!({"text": "slow"}))
                .await
                .unwrap_err();
            assert_eq!(err, ToolError::Timeout);
        }
        // both executions are still running and keep max_calls (2) reserved
        let err = gateway
            .call("echo", "researcher", "run-1", json!({"text": "slow"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::BudgetExceeded(_)));
        assert_eq!(h.log.count("run-1", "tool_call_timeout"), 2);
        assert_eq!(h.log.count("run-1", "tool_call"), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(h.runs.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.usage("run-1").calls_for("echo"), 2);
        let late = h.log.of_type("run-1", "tool_call");
        assert_eq!(late.len(), 2);
        assert!(late.iter().all(|e| e.field("call_ref").is_some()));
        assert!(gateway
            .call("echo", "researcher", "run-1", json!({"text": "again"}))
            .await
            .is_err());
        assert_eq!(h.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_inactive_runs_are_rejected_before_lookup() {
        let h = harness(Arc::new(AllowAll), None, false);
        let book = Arc::new(RunBook::new());
        let gateway = h.gateway.with_run_book(book.clone());

        book.open("run-1", Scenario::HappyPath);
        book.transition("run-1", RunState::Researching).unwrap();
        gateway
            .call("echo", "researcher", "run-1", json!({"text": "live"}))
            .await
            .unwrap();

        book.transition("run-1", RunState::Blocked).unwrap();
        let err = gateway
            .call("echo", "researcher", "run-1", json!({"text": "late"}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::RunNotActive("run-1".to_string()));

        let err = gateway
            .call("echo", "researcher", "run-unknown", json!({"text": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::RunNotActive(_)));

        assert_eq!(h.runs.load(Ordering::SeqCst), 1);
        assert_eq!(h.log.count("run-1", "run_not_active"), 1);
        assert_eq!(h.log.count("run-1", "risk_assessment"), 1);
    }

    #[tokio::test]
    async fn test_rejected_calls_stay_out_of_risk_window() {
        let h = harness(Arc::new(AllowAll), None, false);
        let _ = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"text": 7}))
            .await;
        h.gateway
            .call("echo", "researcher", "run-1", json!({"text": "ok"}))
            .await
            .unwrap();

        assert_eq!(h.gateway.scorer.recent_calls("run-1"), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let h = harness(Arc::new(AllowAll), None, true);
        let err = h
            .gateway
            .call("echo", "researcher", "run-1", json!({"text": "boom"}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Internal);
        assert_eq!(h.log.count("run-1", "tool_call"), 0);
    }

    #[tokio::test]
    async fn test_risk_enforcement_blocks_before_execution() {
        let profile = RiskProfile {
            enforce: true,
            ..RiskProfile::default()
        };
        let h = harness_with(Arc::new(AllowAll), None, false, profile);
        let err = h
            .gateway
            .call(
                "echo",
                "researcher",
                "run-1",
                json!({"text": "cat /etc/passwd; eval(x); exec(y)"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::RiskBlocked { score: 100, .. }));
        assert_eq!(h.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.gateway.usage("run-1").calls_for("echo"), 0);
        assert_eq!(h.log.count("run-1", "risk_block"), 1);
    }

    #[tokio::test]
    async fn test_high_risk_is_advisory_by_default() {
        let h = harness(Arc::new(AllowAll), None, false);
        h.gateway
            .call(
                "echo",
                "researcher",
                "run-1",
                json!({"text": "cat /etc/passwd; eval(x); exec(y)"}),
            )
            .await
            .unwrap();

        let assessment = &h.log.of_type("run-1", "risk_assessment")[0];
        assert_eq!(assessment.field("action"), Some(&json!("block")));
        assert_eq!(h.log.count("run-1", "tool_call"), 1);
    }
}
