//! The run record: status, timestamps, progressive log and final statistics
//! of one scan invocation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::ScanStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: u64,
    pub scanner: String,
    pub status: RunStatus,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub log: String,
    pub stats: Option<ScanStats>,
}

impl ScanRun {
    pub fn new(id: u64, scanner: impl Into<String>) -> Self {
        Self {
            id,
            scanner: scanner.into(),
            status: RunStatus::Pending,
            started: None,
            finished: None,
            log: String::new(),
            stats: None,
        }
    }

    /// Appends one line; lines are newline-joined.
    pub fn append_log(&mut self, line: &str) {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(line);
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.lines()
    }
}

/// Persists run snapshots so that progress is observable while a scan is
/// still in flight.
pub trait RunStore: Send + Sync {
    fn persist(&self, run: &ScanRun) -> anyhow::Result<()>;
}

/// The capability an orchestrator gets over the run it reports into.
pub struct RunHandle<'a> {
    run: &'a mut ScanRun,
    store: &'a dyn RunStore,
}

impl<'a> RunHandle<'a> {
    pub fn new(run: &'a mut ScanRun, store: &'a dyn RunStore) -> Self {
        Self { run, store }
    }

    pub fn run_id(&self) -> u64 {
        self.run.id
    }

    pub fn run(&self) -> &ScanRun {
        &*self.run
    }

    pub fn append_and_persist(&mut self, line: impl AsRef<str>) -> anyhow::Result<()> {
        self.run.append_log(line.as_ref());
        self.store.persist(&*self.run)
    }
}
