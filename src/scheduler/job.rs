use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::BatchError;

/// How a reaped job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationKind {
    /// The process exited on its own.
    Completed,
    /// The process was killed after overrunning its deadline.
    TimedOut,
}

impl std::fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationKind::Completed => write!(f, "completed"),
            TerminationKind::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Immutable description of one queued job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Position in the submitted batch; also the job's identity.
    pub index: usize,
    /// Original command string as submitted.
    pub command: String,
    /// Parsed argument vector, `argv[0]` is the executable.
    pub argv: Vec<String>,
    /// CPU cost charged to the ledger while the job runs.
    pub cost: u32,
}

/// A launched job awaiting reap.
///
/// Holds the child handle, the background pipe readers, and the deadline
/// derived from the shared batch timeout at launch time.
#[derive(Debug)]
pub struct RunningJob {
    pub spec: JobSpec,
    pub child: Child,
    pub launched_at: DateTime<Utc>,
    /// Absolute kill deadline; `None` when the batch has no timeout.
    pub deadline: Option<Instant>,
    pub stdout_task: JoinHandle<Vec<u8>>,
    pub stderr_task: JoinHandle<Vec<u8>>,
    /// Set once a deadline kill has been issued for this job.
    pub killed: bool,
}

impl RunningJob {
    pub fn deadline_passed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }
}

/// Result of one reaped job. Emitted exactly once, at reap time.
#[derive(Debug)]
pub struct LogRecord {
    pub index: usize,
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub kind: TerminationKind,
    pub exit_code: Option<i32>,
    pub launched_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// A job that never entered the running lifecycle, with the reason.
#[derive(Debug)]
pub struct SkippedJob {
    pub index: usize,
    pub command: String,
    pub error: BatchError,
}

/// Outcome of a whole batch. Records are in reap order; skipped jobs were
/// never charged to the ledger.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<LogRecord>,
    pub skipped: Vec<SkippedJob>,
}

impl BatchReport {
    /// Number of jobs killed by the shared deadline.
    pub fn timed_out(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == TerminationKind::TimedOut)
            .count()
    }

    /// True when every submitted job ran to natural completion.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.timed_out() == 0
    }
}
