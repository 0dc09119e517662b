//! Gateway and workflow configuration loader.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use warden_infra::RiskProfile;
use warden_tools::sandbox::DEFAULT_EXFIL_PATTERNS;

pub const PDP_URL_ENV: &str = "WARDEN_PDP_URL";
pub const CATALOG_ENV: &str = "WARDEN_AGENTS_CATALOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub sandbox_dir: PathBuf,
    pub evidence_log: PathBuf,
    pub catalog_path: PathBuf,
    pub max_concurrent_runs: usize,
    pub pdp: PdpConfig,
    pub budget: BudgetConfig,
    pub execution: ExecutionConfig,
    pub risk: RiskProfile,
    pub content_guard: ContentGuardConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: PathBuf::from("sandbox_outputs"),
            evidence_log: PathBuf::from("evidence/evidence.jsonl"),
            catalog_path: PathBuf::from("agents.yaml"),
            max_concurrent_runs: 100,
            pdp: PdpConfig::default(),
            budget: BudgetConfig::default(),
            execution: ExecutionConfig::default(),
            risk: RiskProfile::default(),
            content_guard: ContentGuardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdpConfig {
    pub tool_url: String,
    pub request_url: String,
    pub timeout_ms: u64,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            tool_url: "http://localhost:8181/v1/data/ai/agent/tools/allow_tool".to_string(),
            request_url: "http://localhost:8181/v1/data/ai/policy/allow".to_string(),
            timeout_ms: 2000,
        }
    }
}

impl PdpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub run_ceiling_secs: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            run_ceiling_secs: 300,
        }
    }
}

impl BudgetConfig {
    pub fn run_ceiling(&self) -> Duration {
        Duration::from_secs(self.run_ceiling_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub tool_timeout_ms: u64,
    pub generation_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tool_timeout_ms: 600_000,
            generation_timeout_ms: 120_000,
        }
    }
}

impl ExecutionConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentGuardConfig {
    pub patterns: Vec<String>,
}

impl Default for ContentGuardConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_EXFIL_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl WardenConfig {
    pub fn from_yaml(content: &str) -> Result<Self, WorkflowError> {
        if content.trim().is_empty() {
            return Err(WorkflowError::Config("Config file is empty".to_string()));
        }
        serde_yaml::from_str(content)
            .map_err(|e| WorkflowError::Config(format!("Invalid YAML: {}", e)))
    }

    /// Applies environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(PDP_URL_ENV).filter(|v| !v.is_empty()) {
            self.pdp.tool_url = url;
        }
        if let Some(path) = lookup(CATALOG_ENV).filter(|v| !v.is_empty()) {
            self.catalog_path = PathBuf::from(path);
        }
    }
}

/// Load configuration from a YAML file, then apply process environment
/// overrides.
///
/// # Errors
/// Returns `Config` if the file is missing, empty, or not valid YAML.
pub fn load_config(path: impl AsRef<Path>) -> Result<WardenConfig, WorkflowError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WorkflowError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let mut config = WardenConfig::from_yaml(&content)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
