pub mod infra;

pub use infra::budget_ledger::{BudgetLedger, BudgetPermit, RunUsage, DEFAULT_RUN_CEILING};
pub use infra::contracts::{RiskAction, RiskAssessment, RiskLevel, ToolCallRecord};
pub use infra::evidence_log::{JsonlEvidenceLog, MemoryEvidenceLog};
pub use infra::pdp_client::{PdpOutcome, PolicyDecisionClient, RequestGate, DEFAULT_PDP_TIMEOUT};
pub use infra::risk_scorer::{
    RiskProfile, RiskProfileError, RiskScorer, SuspiciousSequence, WeightedPattern,
};
