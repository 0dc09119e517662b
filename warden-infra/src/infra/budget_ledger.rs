use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warden_tools::{Tool, ToolError};

/// Ceiling on cumulative execution time for a whole run, independent of any
/// single tool's `max_seconds`.
pub const DEFAULT_RUN_CEILING: Duration = Duration::from_secs(300);

/// Snapshot of one run's recorded usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUsage {
    pub calls: HashMap<String, u32>,
    pub elapsed: Duration,
}

impl RunUsage {
    pub fn calls_for(&self, tool_name: &str) -> u32 {
        self.calls.get(tool_name).copied().unwrap_or(0)
    }
}

#[derive(Default)]
struct RunBudget {
    usage: RunUsage,
    in_flight: HashMap<String, u32>,
}

impl RunBudget {
    fn release(&mut self, tool_name: &str) {
        if let Some(count) = self.in_flight.get_mut(tool_name) {
            *count = count.saturating_sub(1);
        }
    }
}

type Runs = Arc<Mutex<HashMap<String, RunBudget>>>;

/// Per-run call-count and elapsed-time accounting. All mutation goes through
/// one lock, so concurrent calls in the same run never lose an increment.
pub struct BudgetLedger {
    runs: Runs,
    run_ceiling: Duration,
}

/// A reserved call slot. Committed by `BudgetLedger::record`; dropping it
/// uncommitted frees the slot without touching recorded usage.
#[must_use]
pub struct BudgetPermit {
    runs: Runs,
    run_id: String,
    tool_name: String,
    settled: bool,
}

impl Drop for BudgetPermit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(run) = self.runs.lock().get_mut(&self.run_id) {
            run.release(&self.tool_name);
        }
    }
}

impl Default for BudgetLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetLedger {
    pub fn new() -> Self {
        Self::with_ceiling(DEFAULT_RUN_CEILING)
    }

    pub fn with_ceiling(run_ceiling: Duration) -> Self {
        Self {
            runs: Arc::new(Mutex::new(HashMap::new())),
            run_ceiling,
        }
    }

    pub fn run_ceiling(&self) -> Duration {
        self.run_ceiling
    }

    /// Fails with `BudgetExceeded` once the tool's call count for this run
    /// (including calls still executing) reaches `max_calls`, or once the
    /// run's elapsed time reaches the ceiling.
    pub fn check(&self, tool: &dyn Tool, run_id: &str) -> Result<BudgetPermit, ToolError> {
        let name = tool.name();
        let mut runs = self.runs.lock();
        let run = runs.entry(run_id.to_string()).or_default();

        let reserved = run.in_flight.get(name).copied().unwrap_or(0);
        let used = run.usage.calls_for(name) + reserved;
        if used >= tool.max_calls() {
            warn!("Budget exhausted for {} in run {}", name, run_id);
            return Err(ToolError::BudgetExceeded(format!(
                "max_calls_exceeded:{} (limit: {})",
                name,
                tool.max_calls()
            )));
        }

        if run.usage.elapsed >= self.run_ceiling {
            warn!("Run {} exceeded its time ceiling", run_id);
            return Err(ToolError::BudgetExceeded(format!(
                "max_run_time_exceeded (spent: {:.1}s, limit: {}s)",
                run.usage.elapsed.as_secs_f64(),
                self.run_ceiling.as_secs()
            )));
        }

        *run.in_flight.entry(name.to_string()).or_insert(0) += 1;
        Ok(BudgetPermit {
            runs: Arc::clone(&self.runs),
            run_id: run_id.to_string(),
            tool_name: name.to_string(),
            settled: false,
        })
    }

    /// Commits a reserved call and its elapsed time.
    pub fn record(&self, mut permit: BudgetPermit, elapsed: Duration) {
        let mut runs = self.runs.lock();
        let run = runs.entry(permit.run_id.clone()).or_default();
        run.release(&permit.tool_name);
        *run.usage.calls.entry(permit.tool_name.clone()).or_insert(0) += 1;
        run.usage.elapsed += elapsed;
        permit.settled = true;
        debug!(
            "Recorded {} for run {} ({:.3}s, total {:.3}s)",
            permit.tool_name,
            permit.run_id,
            elapsed.as_secs_f64(),
            run.usage.elapsed.as_secs_f64()
        );
    }

    pub fn usage(&self, run_id: &str) -> RunUsage {
        self.runs
            .lock()
            .get(run_id)
            .map(|run| run.usage.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::thread;
    use warden_tools::ExecutionContext;

    struct Limited(u32);

    #[async_trait]
    impl Tool for Limited {
        fn name(&self) -> &'static str {
            "limited"
        }

        fn description(&self) -> &'static str {
            "limited"
        }

        fn schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn max_calls(&self) -> u32 {
            self.0
        }

        async fn execute(&self, _ctx: ExecutionContext, _input: Value) -> Result<Value, ToolError> {
            Ok(json!({}))
        }
    }

    #[test]
    fn call_limit_is_enforced_per_run() {
        let ledger = BudgetLedger::new();
        let tool = Limited(2);

        for _ in 0..2 {
            let permit = ledger.check(&tool, "run-1").unwrap();
            ledger.record(permit, Duration::from_millis(5));
        }

        assert!(matches!(
            ledger.check(&tool, "run-1"),
            Err(ToolError::BudgetExceeded(_))
        ));
        assert!(ledger.check(&tool, "run-2").is_ok());
        assert_eq!(ledger.usage("run-1").calls_for("limited"), 2);
    }

    #[test]
    fn dropped_permit_is_not_counted() {
        let ledger = BudgetLedger::new();
        let tool = Limited(1);

        drop(ledger.check(&tool, "run-1").unwrap());
        assert_eq!(ledger.usage("run-1").calls_for("limited"), 0);

        let permit = ledger.check(&tool, "run-1").unwrap();
        ledger.record(permit, Duration::ZERO);
        assert_eq!(ledger.usage("run-1").calls_for("limited"), 1);
    }

    #[test]
    fn in_flight_calls_hold_their_slot() {
        let ledger = BudgetLedger::new();
        let tool = Limited(1);

        let _held = ledger.check(&tool, "run-1").unwrap();
        assert!(ledger.check(&tool, "run-1").is_err());
    }

    #[test]
    fn run_ceiling_stops_further_calls() {
        let ledger = BudgetLedger::with_ceiling(Duration::from_secs(1));
        let tool = Limited(100);

        let permit = ledger.check(&tool, "run-1").unwrap();
        ledger.record(permit, Duration::from_millis(1500));

        match ledger.check(&tool, "run-1") {
            Err(ToolError::BudgetExceeded(msg)) => assert!(msg.contains("max_run_time_exceeded")),
            other => panic!("expected BudgetExceeded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn usage_is_monotonic() {
        let ledger = BudgetLedger::new();
        let tool = Limited(10);
        let mut last = RunUsage::default();

        for _ in 0..5 {
            let permit = ledger.check(&tool, "run-1").unwrap();
            ledger.record(permit, Duration::from_millis(3));
            let now = ledger.usage("run-1");
            assert!(now.calls_for("limited") > last.calls_for("limited"));
            assert!(now.elapsed > last.elapsed);
            last = now;
        }
    }

    #[test]
    fn concurrent_calls_never_exceed_limit() {
        let ledger = Arc::new(BudgetLedger::new());
        let tool = Arc::new(Limited(5));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let tool = Arc::clone(&tool);
                thread::spawn(move || match ledger.check(&*tool, "run-1") {
                    Ok(permit) => {
                        ledger.record(permit, Duration::from_millis(1));
                        true
                    }
                    Err(_) => false,
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 5);
        assert_eq!(ledger.usage("run-1").calls_for("limited"), 5);
    }
}
