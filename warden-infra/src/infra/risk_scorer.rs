//! Contextual and behavioral risk scoring. Advisory: every assessment is
//! logged, none of them gate execution unless the caller enforces it.

use crate::infra::contracts::{RiskAction, RiskAssessment, RiskLevel};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use warden_tools::EvidenceSink;

const MAX_SCORE: u32 = 100;
const MEDIUM_THRESHOLD: u32 = 31;
const HIGH_THRESHOLD: u32 = 70;

#[derive(Error, Debug)]
pub enum RiskProfileError {
    #[error("invalid risk pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPattern {
    pub pattern: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousSequence {
    pub tools: Vec<String>,
    pub weight: u32,
}

/// Tunable scoring tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskProfile {
    pub patterns: Vec<WeightedPattern>,
    pub sequences: Vec<SuspiciousSequence>,
    pub side_effect_tools: Vec<String>,
    pub side_effect_weight: u32,
    pub size_threshold: usize,
    pub size_weight: u32,
    pub history_window: usize,
    /// Deny calls whose assessment action is `block`. Off by default.
    pub enforce: bool,
}

impl Default for RiskProfile {
    fn default() -> Self {
        let pattern = |pattern: &str, weight| WeightedPattern {
            pattern: pattern.to_string(),
            weight,
        };
        let sequence = |tools: &[&str], weight| SuspiciousSequence {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            weight,
        };

        Self {
            patterns: vec![
                // exfiltration / destination
                pattern("exfiltrat", 40),
                pattern("send.*to.*@", 35),
                pattern("leak", 30),
                pattern("steal", 35),
                pattern("transfer.*external", 40),
                // filesystem
                pattern(r"\.\./", 45),
                pattern("/etc/", 50),
                pattern("/root/", 50),
                // code execution
                pattern(r"eval\(", 50),
                pattern(r"exec\(", 50),
                pattern("__import__", 45),
                // credentials
                pattern("password", 25),
                pattern("api[_-]?key", 30),
                pattern("secret", 25),
                pattern("token", 20),
            ],
            sequences: vec![
                sequence(&["search_docs", "search_docs", "search_docs"], 20),
                sequence(&["read_file", "read_file"], 25),
                sequence(&["write_to_file", "write_to_file"], 30),
            ],
            side_effect_tools: vec![
                "send_email".to_string(),
                "write_to_file".to_string(),
                "delete_file".to_string(),
            ],
            side_effect_weight: 15,
            size_threshold: 5000,
            size_weight: 20,
            history_window: 5,
            enforce: false,
        }
    }
}

pub struct RiskScorer {
    patterns: Vec<(String, Regex, u32)>,
    profile: RiskProfile,
    history: Mutex<HashMap<String, VecDeque<String>>>,
    sink: Arc<dyn EvidenceSink>,
}

impl RiskScorer {
    pub fn new(profile: RiskProfile, sink: Arc<dyn EvidenceSink>) -> Result<Self, RiskProfileError> {
        let patterns = profile
            .patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(&p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (p.pattern.clone(), re, p.weight))
                    .map_err(|source| RiskProfileError::InvalidPattern {
                        pattern: p.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            profile,
            history: Mutex::new(HashMap::new()),
            sink,
        })
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    /// Scores one call attempt against the run's rolling window and appends
    /// the assessment to the evidence sink. The attempt itself only enters the
    /// window through `record_call`.
    pub fn assess(
        &self,
        agent_id: &str,
        tool_name: &str,
        payload: &Value,
        run_id: &str,
        authorized: bool,
    ) -> RiskAssessment {
        let (score, reasons) = if authorized {
            let window = self.window_with(run_id, tool_name);
            self.evaluate(tool_name, payload, &window)
        } else {
            (MAX_SCORE, vec!["not_in_agent_allowlist".to_string()])
        };

        let assessment = build(run_id, agent_id, tool_name, score, reasons);
        match assessment.action {
            RiskAction::Allow => {}
            RiskAction::LogAndAllow => info!(
                "Medium risk ({}) for {} by {} in run {}",
                assessment.risk_score, tool_name, agent_id, run_id
            ),
            RiskAction::Block => warn!(
                "High risk ({}) for {} by {} in run {}",
                assessment.risk_score, tool_name, agent_id, run_id
            ),
        }
        self.sink.record(assessment.to_event());
        assessment
    }

    /// Pure scoring over a payload and an explicit recent-call window.
    pub fn evaluate(&self, tool_name: &str, payload: &Value, recent: &[String]) -> (u32, Vec<String>) {
        let mut score = 0u32;
        let mut reasons = Vec::new();

        let text = serde_json::to_string(payload)
            .unwrap_or_default()
            .to_lowercase();
        for (pattern, re, weight) in &self.patterns {
            if re.is_match(&text) {
                score = score.saturating_add(*weight);
                reasons.push(format!("suspicious_pattern:{}", pattern));
            }
        }

        for sequence in &self.profile.sequences {
            if contains_run(recent, &sequence.tools) {
                score = score.saturating_add(sequence.weight);
                reasons.push(format!("unusual_sequence:{}", sequence.tools.join(">")));
            }
        }

        if self.profile.side_effect_tools.iter().any(|t| t == tool_name) {
            score = score.saturating_add(self.profile.side_effect_weight);
            reasons.push("side_effect_tool".to_string());
        }

        if text.len() > self.profile.size_threshold {
            score = score.saturating_add(self.profile.size_weight);
            reasons.push("large_payload".to_string());
        }

        (score, reasons)
    }

    /// Recent tool names for a run, oldest first.
    pub fn recent_calls(&self, run_id: &str) -> Vec<String> {
        self.history
            .lock()
            .get(run_id)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends a call that cleared every pre-execution check to the run's
    /// window.
    pub fn record_call(&self, run_id: &str, tool_name: &str) {
        let mut history = self.history.lock();
        let window = history.entry(run_id.to_string()).or_default();
        window.push_back(tool_name.to_string());
        while window.len() > self.window_size() {
            window.pop_front();
        }
    }

    /// The run's window as it would look with `tool_name` appended.
    fn window_with(&self, run_id: &str, tool_name: &str) -> Vec<String> {
        let mut window = self.recent_calls(run_id);
        window.push(tool_name.to_string());
        let excess = window.len().saturating_sub(self.window_size());
        window.drain(..excess);
        window
    }

    fn window_size(&self) -> usize {
        self.profile.history_window.max(1)
    }
}

fn contains_run(recent: &[String], sequence: &[String]) -> bool {
    !sequence.is_empty()
        && recent.len() >= sequence.len()
        && recent.windows(sequence.len()).any(|w| w == sequence)
}

fn classify(score: u32) -> (RiskLevel, RiskAction) {
    if score >= HIGH_THRESHOLD {
        (RiskLevel::High, RiskAction::Block)
    } else if score >= MEDIUM_THRESHOLD {
        (RiskLevel::Medium, RiskAction::LogAndAllow)
    } else {
        (RiskLevel::Low, RiskAction::Allow)
    }
}

fn build(run_id: &str, agent_id: &str, tool_name: &str, score: u32, reasons: Vec<String>) -> RiskAssessment {
    let clamped = score.min(MAX_SCORE);
    let (risk_level, action) = classify(clamped);
    RiskAssessment {
        run_id: run_id.to_string(),
        agent_id: agent_id.to_string(),
        tool_name: tool_name.to_string(),
        risk_score: clamped as u8,
        risk_level,
        reasons,
        action,
    }
}
