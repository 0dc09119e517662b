//! Fail-closed client for the external policy decision point.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use warden_tools::{AuthDecision, Authorizer, DenialReason};

pub const DEFAULT_PDP_TIMEOUT: Duration = Duration::from_secs(2);

/// Raw three-way answer from the decision point. Only `Allow` permits a call;
/// the other outcomes are mapped to a categorized deny at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdpOutcome {
    Allow,
    Deny,
    Unavailable(String),
    Error(String),
}

impl PdpOutcome {
    pub fn into_decision(self) -> AuthDecision {
        match self {
            PdpOutcome::Allow => AuthDecision::Allow,
            PdpOutcome::Deny => {
                AuthDecision::deny(DenialReason::PolicyDenied, "no explicit allow from policy")
            }
            PdpOutcome::Unavailable(detail) => {
                AuthDecision::deny(DenialReason::DecisionPointUnavailable, detail)
            }
            PdpOutcome::Error(detail) => AuthDecision::deny(DenialReason::DecisionPointError, detail),
        }
    }
}

/// Request-level gate input: who is asking and what for.
#[derive(Debug, Clone, Serialize)]
pub struct RequestGate {
    pub user: Value,
    pub intent: String,
    pub contains_sensitive: bool,
}

pub struct PolicyDecisionClient {
    tool_url: String,
    request_url: String,
    client: reqwest::Client,
}

impl PolicyDecisionClient {
    pub fn new(
        tool_url: impl Into<String>,
        request_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            tool_url: tool_url.into(),
            request_url: request_url.into(),
            client,
        })
    }

    /// Asks whether `agent_id` may call `tool_name`. Never retries.
    pub async fn evaluate_tool(&self, agent_id: &str, tool_name: &str) -> PdpOutcome {
        let body = json!({"input": {"agent": agent_id, "tool": tool_name}});
        self.query(&self.tool_url, &body).await
    }

    /// Request-level gate, evaluated before any agent work starts.
    pub async fn evaluate_request(&self, gate: &RequestGate) -> AuthDecision {
        let body = json!({
            "input": {
                "user": gate.user,
                "request": {
                    "intent": gate.intent,
                    "contains_sensitive": gate.contains_sensitive,
                }
            }
        });
        self.query(&self.request_url, &body).await.into_decision()
    }

    async fn query(&self, url: &str, body: &Value) -> PdpOutcome {
        let response = match self.client.post(url).json(body).send().await {
            Ok(response) => response,
            Err(e) => return PdpOutcome::Unavailable(e.to_string()),
        };
        let status = response.status();
        match response.bytes().await {
            Ok(bytes) => interpret(status, &bytes),
            Err(e) => PdpOutcome::Unavailable(e.to_string()),
        }
    }
}

/// Maps a decision-point response onto an outcome. Only a success status
/// whose body carries `"result": true` is an allow.
pub fn interpret(status: StatusCode, body: &[u8]) -> PdpOutcome {
    if !status.is_success() {
        return PdpOutcome::Error(format!("decision point returned {}", status));
    }
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => return PdpOutcome::Error(format!("malformed decision: {}", e)),
    };
    match parsed.get("result") {
        Some(Value::Bool(true)) => PdpOutcome::Allow,
        _ => PdpOutcome::Deny,
    }
}

#[async_trait]
impl Authorizer for PolicyDecisionClient {
    async fn decide(&self, agent_id: &str, tool_name: &str) -> AuthDecision {
        let outcome = self.evaluate_tool(agent_id, tool_name).await;
        match &outcome {
            PdpOutcome::Allow => debug!("PDP allowed {} -> {}", agent_id, tool_name),
            PdpOutcome::Deny => warn!("PDP denied {} -> {}", agent_id, tool_name),
            PdpOutcome::Unavailable(e) => warn!("PDP unavailable, failing closed: {}", e),
            PdpOutcome::Error(e) => warn!("PDP error, failing closed: {}", e),
        }
        outcome.into_decision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_true_allows() {
        assert_eq!(interpret(StatusCode::OK, br#"{"result": true}"#), PdpOutcome::Allow);
        assert_eq!(interpret(StatusCode::OK, br#"{"result": false}"#), PdpOutcome::Deny);
        assert_eq!(interpret(StatusCode::OK, br#"{}"#), PdpOutcome::Deny);
        assert_eq!(interpret(StatusCode::OK, br#"{"result": "true"}"#), PdpOutcome::Deny);
        assert_eq!(interpret(StatusCode::OK, br#"{"result": {"allow": true}}"#), PdpOutcome::Deny);
    }

    #[test]
    fn non_success_and_garbage_are_errors() {
        assert!(matches!(
            interpret(StatusCode::INTERNAL_SERVER_ERROR, br#"{"result": true}"#),
            PdpOutcome::Error(_)
        ));
        assert!(matches!(interpret(StatusCode::OK, b"<html>"), PdpOutcome::Error(_)));
    }

    #[test]
    fn outcomes_map_to_distinct_denial_reasons() {
        let reason = |outcome: PdpOutcome| match outcome.into_decision() {
            AuthDecision::Deny { reason, .. } => Some(reason),
            AuthDecision::Allow => None,
        };
        assert_eq!(reason(PdpOutcome::Allow), None);
        assert_eq!(reason(PdpOutcome::Deny), Some(DenialReason::PolicyDenied));
        assert_eq!(
            reason(PdpOutcome::Unavailable("refused".into())),
            Some(DenialReason::DecisionPointUnavailable)
        );
        assert_eq!(
            reason(PdpOutcome::Error("503".into())),
            Some(DenialReason::DecisionPointError)
        );
    }
}
