pub mod admission;
pub mod job;
pub mod plan;

pub use admission::{CpuLedger, Scheduler};
pub use job::{BatchReport, JobSpec, LogRecord, RunningJob, SkippedJob, TerminationKind};
