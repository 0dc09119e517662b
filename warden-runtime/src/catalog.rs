//! Capability catalog: which agent identities exist and which tools each may use.

use crate::error::WorkflowError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};
use warden_tools::{AuthDecision, Authorizer, DenialReason};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentEntry {
    pub id: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentCatalog {
    pub agents: Vec<AgentEntry>,
}

impl AgentCatalog {
    /// Loads the catalog. A missing, unreadable, or malformed file degrades to
    /// an empty catalog, which then fails required-agent validation.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Catalog not readable at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!("Invalid catalog at {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentEntry> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.get(agent_id).is_some()
    }

    pub fn allows(&self, agent_id: &str, tool_name: &str) -> bool {
        self.get(agent_id)
            .map(|a| a.allowed_tools.iter().any(|t| t == tool_name))
            .unwrap_or(false)
    }

    /// Fails with `CatalogValidation` naming every required identity that is
    /// absent.
    pub fn validate_required(&self, required: &[&str]) -> Result<(), WorkflowError> {
        let missing: BTreeSet<&str> = required
            .iter()
            .copied()
            .filter(|id| !self.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let missing: Vec<&str> = missing.into_iter().collect();
        Err(WorkflowError::CatalogValidation(format!(
            "Required agents not found in catalog: {}",
            missing.join(", ")
        )))
    }
}

/// Answers authorization from the catalog's allow-lists, without a remote
/// decision point.
pub struct CatalogAuthorizer {
    catalog: AgentCatalog,
}

impl CatalogAuthorizer {
    pub fn new(catalog: AgentCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Authorizer for CatalogAuthorizer {
    async fn decide(&self, agent_id: &str, tool_name: &str) -> AuthDecision {
        if self.catalog.allows(agent_id, tool_name) {
            debug!("Catalog allows {} -> {}", agent_id, tool_name);
            return AuthDecision::Allow;
        }
        let detail = if self.catalog.contains(agent_id) {
            format!("tool '{}' not in allow-list", tool_name)
        } else {
            format!("agent '{}' not in catalog", agent_id)
        };
        AuthDecision::deny(DenialReason::PolicyDenied, detail)
    }
}
