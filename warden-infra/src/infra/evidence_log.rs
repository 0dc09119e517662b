use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use warden_tools::{EvidenceError, EvidenceEvent, EvidenceSink};

/// Durable JSON-lines evidence log. One line per event, flushed to disk
/// before `append` returns.
pub struct JsonlEvidenceLog {
    log_path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEvidenceLog {
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self, EvidenceError> {
        let log_path = log_path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            log_path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Reads every event back in file order, for replay and audit tooling.
    pub fn read_events<P: AsRef<Path>>(log_path: P) -> Result<Vec<EvidenceEvent>, EvidenceError> {
        let file = File::open(log_path)?;
        let mut events = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}

impl EvidenceSink for JsonlEvidenceLog {
    fn append(&self, event: EvidenceEvent) -> Result<(), EvidenceError> {
        // Serialize outside the lock; write the whole line under it.
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// In-process evidence log with query helpers.
#[derive(Default)]
pub struct MemoryEvidenceLog {
    events: Mutex<Vec<EvidenceEvent>>,
}

impl MemoryEvidenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EvidenceEvent> {
        self.events.lock().clone()
    }

    pub fn for_run(&self, run_id: &str) -> Vec<EvidenceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn of_type(&self, run_id: &str, event_type: &str) -> Vec<EvidenceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.run_id == run_id && e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn count(&self, run_id: &str, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.run_id == run_id && e.event_type == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EvidenceSink for MemoryEvidenceLog {
    fn append(&self, event: EvidenceEvent) -> Result<(), EvidenceError> {
        self.events.lock().push(event);
        Ok(())
    }
}
