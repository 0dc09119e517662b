use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warden_tools::EvidenceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    Allow,
    LogAndAllow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub run_id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub action: RiskAction,
}

impl RiskAssessment {
    pub fn to_event(&self) -> EvidenceEvent {
        EvidenceEvent::new("risk_assessment", &self.run_id)
            .with("agent_id", self.agent_id.as_str())
            .with("tool", self.tool_name.as_str())
            .with("risk_score", self.risk_score)
            .with("risk_level", json!(self.risk_level))
            .with("reasons", json!(self.reasons))
            .with("action", json!(self.action))
    }
}

/// One completed, authorized tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub run_id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub payload: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub elapsed_secs: f64,
    pub timestamp: String,
    pub authorized: bool,
}

impl ToolCallRecord {
    pub fn success(
        run_id: &str,
        agent_id: &str,
        tool_name: &str,
        payload: Value,
        result: Value,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            agent_id: agent_id.to_string(),
            tool_name: tool_name.to_string(),
            payload,
            result: Some(result),
            error: None,
            elapsed_secs,
            timestamp: chrono::Utc::now().to_rfc3339(),
            authorized: true,
        }
    }

    pub fn to_event(&self) -> EvidenceEvent {
        let mut event = EvidenceEvent::new("tool_call", &self.run_id)
            .with("agent_id", self.agent_id.as_str())
            .with("tool", self.tool_name.as_str())
            .with("payload", self.payload.clone())
            .with("elapsed", self.elapsed_secs)
            .with("authorized", self.authorized);
        event.timestamp = self.timestamp.clone();
        if let Some(result) = &self.result {
            event = event.with("result", result.clone());
        }
        if let Some(error) = &self.error {
            event = event.with("error", error.as_str());
        }
        event
    }
}
