pub mod budget_ledger;
pub mod contracts;
pub mod evidence_log;
pub mod pdp_client;
pub mod risk_scorer;
