//! Warden runtime: the governed tool-call gateway and the three-stage
//! workflow that runs through it.

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod response;
pub mod run;

pub use catalog::{AgentCatalog, AgentEntry, CatalogAuthorizer};
pub use config::{load_config, WardenConfig};
pub use error::WorkflowError;
pub use gateway::ToolGateway;
pub use orchestrator::{
    new_run_id, WorkflowFailure, WorkflowOrchestrator, WorkflowReport, ANALYST, RESEARCHER, WRITER,
};
pub use response::WorkflowResponse;
pub use run::{RunBook, RunRecord, RunState, Scenario};
