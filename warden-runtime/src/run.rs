//! Run lifecycle: the workflow state machine and the book of runs.

use crate::error::WorkflowError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    Researching,
    Analyzing,
    Writing,
    Finished,
    Blocked,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Researching => "researching",
            RunState::Analyzing => "analyzing",
            RunState::Writing => "writing",
            RunState::Finished => "finished",
            RunState::Blocked => "blocked",
            RunState::Failed => "failed",
        }
    }

    /// Coarse status exposed at the boundary.
    pub fn status(&self) -> &'static str {
        match self {
            RunState::Created | RunState::Researching | RunState::Analyzing | RunState::Writing => {
                "running"
            }
            RunState::Finished => "finished",
            RunState::Blocked => "blocked",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Blocked | RunState::Failed)
    }

    /// Forward stage order, plus `Blocked`/`Failed` from any live state.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Created, Researching)
            | (Researching, Analyzing)
            | (Analyzing, Writing)
            | (Writing, Finished) => true,
            (from, Blocked | Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    HappyPath,
    UnauthorizedTool,
    ExfilAttempt,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::HappyPath => "happy_path",
            Scenario::UnauthorizedTool => "unauthorized_tool",
            Scenario::ExfilAttempt => "exfil_attempt",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scenario {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy_path" => Ok(Scenario::HappyPath),
            "unauthorized_tool" => Ok(Scenario::UnauthorizedTool),
            "exfil_attempt" => Ok(Scenario::ExfilAttempt),
            other => Err(WorkflowError::Config(format!("unknown scenario: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub scenario: Scenario,
    pub state: RunState,
}

/// Every run started in this process, keyed by run id. Runs are never removed.
#[derive(Default)]
pub struct RunBook {
    runs: Mutex<HashMap<String, RunRecord>>,
}

impl RunBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, run_id: &str, scenario: Scenario) {
        self.runs.lock().insert(
            run_id.to_string(),
            RunRecord {
                run_id: run_id.to_string(),
                scenario,
                state: RunState::Created,
            },
        );
    }

    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.lock().get(run_id).cloned()
    }

    pub fn state(&self, run_id: &str) -> Option<RunState> {
        self.runs.lock().get(run_id).map(|r| r.state)
    }

    /// Moves a run to `next`, returning the previous state.
    pub fn transition(&self, run_id: &str, next: RunState) -> Result<RunState, WorkflowError> {
        let mut runs = self.runs.lock();
        let record = runs
            .get_mut(run_id)
            .ok_or_else(|| WorkflowError::InvalidTransition {
                run_id: run_id.to_string(),
                from: "unknown".to_string(),
                to: next.to_string(),
            })?;

        if !record.state.can_transition_to(next) {
            return Err(WorkflowError::InvalidTransition {
                run_id: run_id.to_string(),
                from: record.state.to_string(),
                to: next.to_string(),
            });
        }
        let previous = record.state;
        record.state = next;
        Ok(previous)
    }

    /// Tool calls are only permitted on live runs.
    pub fn ensure_active(&self, run_id: &str) -> Result<(), WorkflowError> {
        match self.state(run_id) {
            Some(state) if !state.is_terminal() => Ok(()),
            _ => Err(WorkflowError::RunTerminated(run_id.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.lock().is_empty()
    }
}
