//! Boundary response: what a caller outside the core sees for a run.

use crate::orchestrator::{WorkflowFailure, WorkflowReport};
use crate::run::RunState;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResponse {
    pub run_id: String,
    pub scenario: String,
    pub status: String,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<Value>,
}

impl WorkflowResponse {
    /// Separates "blocked by a security control" from "technical failure".
    pub fn from_result(result: &Result<WorkflowReport, WorkflowFailure>) -> Self {
        match result {
            Ok(report) => Self {
                run_id: report.run_id.clone(),
                scenario: report.scenario.to_string(),
                status: report.status.status().to_string(),
                blocked: false,
                reason: None,
                error: None,
                message: None,
                writer: Some(report.writer.clone()),
            },
            Err(failure) if failure.status == RunState::Blocked => Self {
                run_id: failure.run_id.clone(),
                scenario: failure.scenario.to_string(),
                status: "blocked".to_string(),
                blocked: true,
                reason: Some("security_violation".to_string()),
                error: Some(failure.error.to_string()),
                message: Some("Operation blocked by security controls".to_string()),
                writer: None,
            },
            Err(failure) => Self {
                run_id: failure.run_id.clone(),
                scenario: failure.scenario.to_string(),
                status: "failed".to_string(),
                blocked: false,
                reason: Some(failure.error.kind().to_string()),
                error: Some(failure.error.to_string()),
                message: None,
                writer: None,
            },
        }
    }
}
