//! Evidence events: the append-only audit record shared by every component.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

const RESERVED_FIELDS: &[&str] = &["type", "run_id", "timestamp"];

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One audit record. `type`, `run_id` and `timestamp` are always present;
/// everything else lives in the open `fields` map and is flattened on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub run_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EvidenceEvent {
    pub fn new(event_type: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            run_id: run_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            fields: Map::new(),
        }
    }

    /// Adds an extension field. Reserved keys are never overwritten.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        if RESERVED_FIELDS.contains(&key) {
            warn!("Ignoring reserved evidence field: {}", key);
            return self;
        }
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Append-only audit sink. Implementations serialize writers so no record is
/// ever partially visible.
pub trait EvidenceSink: Send + Sync {
    fn append(&self, event: EvidenceEvent) -> Result<(), EvidenceError>;

    /// Appends and reports failures through tracing instead of failing the
    /// caller's operation.
    fn record(&self, event: EvidenceEvent) {
        let event_type = event.event_type.clone();
        if let Err(e) = self.append(event) {
            error!("Failed to append {} evidence: {}", event_type, e);
        }
    }
}
