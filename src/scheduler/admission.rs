use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout_at, Instant};

use crate::command;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::logger::BatchLogger;
use crate::scheduler::job::{
    BatchReport, JobSpec, LogRecord, RunningJob, SkippedJob, TerminationKind,
};
use crate::scheduler::plan;
use crate::worker::ProcessLauncher;

/// Pause between unsuccessful sweep passes while waiting for budget.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Running total of committed CPU cost against a fixed budget.
///
/// Owned exclusively by the scheduler loop; `used` exceeds `capacity` only
/// between the tentative charge for the next queued job and its admission.
#[derive(Debug)]
pub struct CpuLedger {
    used: u64,
    capacity: u64,
}

impl CpuLedger {
    pub fn new(capacity: u64) -> Self {
        Self { used: 0, capacity }
    }

    pub fn charge(&mut self, cost: u32) {
        self.used += u64::from(cost);
    }

    pub fn release(&mut self, cost: u32) {
        self.used = self.used.saturating_sub(u64::from(cost));
    }

    pub fn over_capacity(&self) -> bool {
        self.used > self.capacity
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

/// Admission-controlled batch scheduler.
///
/// Drives the whole batch from a single control task: charges each queued
/// job's cost to the ledger, waits (reaping and killing as needed) until the
/// budget fits, launches the job, and finally drains every running job.
/// Launch order always equals submission order; reaping always picks the
/// first job in insertion order among those already exited.
pub struct Scheduler {
    config: BatchConfig,
    logger: BatchLogger,
}

impl Scheduler {
    pub fn new(config: BatchConfig, logger: BatchLogger) -> Self {
        Self { config, logger }
    }

    /// Run the batch to completion. Returns only once every admitted job has
    /// been reaped and the ledger reads zero. Per-job failures never abort
    /// the batch; they are recorded in the report.
    pub async fn run(&mut self, commands: &[String]) -> BatchReport {
        let costs = plan::resolve_costs(
            commands.len(),
            self.config.weights.as_deref(),
            self.config.capacity,
        );
        let launcher = ProcessLauncher::new(self.config.env.clone());
        let mut ledger = CpuLedger::new(self.config.capacity);
        let mut active: Vec<RunningJob> = Vec::new();
        let mut report = BatchReport::default();

        tracing::info!(
            jobs = commands.len(),
            capacity = self.config.capacity,
            timeout = ?self.config.timeout,
            "starting batch"
        );

        for (index, command) in commands.iter().enumerate() {
            let cost = costs[index];

            let argv = match command::split(command) {
                Ok(argv) => argv,
                Err(error) => {
                    tracing::warn!(index, command = %command, %error, "skipping unparseable job");
                    report.skipped.push(SkippedJob {
                        index,
                        command: command.clone(),
                        error,
                    });
                    continue;
                }
            };

            // An oversized job could never be admitted; rejecting it here
            // keeps the admission loop from spinning forever.
            if u64::from(cost) > ledger.capacity() {
                let error = BatchError::OversizedJob {
                    cost,
                    capacity: ledger.capacity(),
                };
                tracing::warn!(index, command = %command, cost, %error, "skipping oversized job");
                report.skipped.push(SkippedJob {
                    index,
                    command: command.clone(),
                    error,
                });
                continue;
            }

            let spec = JobSpec {
                index,
                command: command.clone(),
                argv,
                cost,
            };

            // Tentative charge; admission waits until the budget fits again.
            ledger.charge(cost);
            while ledger.over_capacity() {
                Self::kill_overdue(&mut active);
                let reaped =
                    Self::try_reap(&mut active, &mut ledger, &mut self.logger, &mut report.records)
                        .await;
                if !reaped {
                    sleep(POLL_INTERVAL).await;
                }
            }

            match launcher.launch(&spec, self.config.timeout) {
                Ok(running) => {
                    tracing::info!(
                        job = index + 1,
                        total = commands.len(),
                        command = %spec.command,
                        cost,
                        used = ledger.used(),
                        "launched job"
                    );
                    active.push(running);
                }
                Err(error) => {
                    ledger.release(cost);
                    tracing::warn!(index, command = %spec.command, %error, "skipping unlaunchable job");
                    report.skipped.push(SkippedJob {
                        index,
                        command: spec.command,
                        error,
                    });
                }
            }
        }

        // Queue exhausted: bounded wait on each remaining job, measured from
        // that job's own launch. The only non-polling wait in the loop.
        for job in active.iter_mut() {
            match job.deadline {
                Some(deadline) => {
                    if timeout_at(deadline, job.child.wait()).await.is_err() && !job.killed {
                        tracing::info!(index = job.spec.index, "deadline expired, killing job");
                        // Already-exited processes make this a no-op.
                        let _ = job.child.start_kill();
                        job.killed = true;
                    }
                }
                None => {
                    let _ = job.child.wait().await;
                }
            }
        }

        // Drain every remaining job, first in insertion order among exited.
        while !active.is_empty() {
            Self::kill_overdue(&mut active);
            let reaped =
                Self::try_reap(&mut active, &mut ledger, &mut self.logger, &mut report.records)
                    .await;
            if !reaped {
                sleep(POLL_INTERVAL).await;
            }
        }

        debug_assert_eq!(ledger.used(), 0);
        tracing::info!(
            completed = report.records.len(),
            skipped = report.skipped.len(),
            timed_out = report.timed_out(),
            "batch finished"
        );
        report
    }

    /// Issue a kill to every running job whose deadline has passed.
    fn kill_overdue(active: &mut Vec<RunningJob>) {
        let now = Instant::now();
        for job in active.iter_mut() {
            if job.killed || !job.deadline_passed(now) {
                continue;
            }
            if matches!(job.child.try_wait(), Ok(Some(_))) {
                // Exited on its own before the kill; reaped as Completed.
                continue;
            }
            tracing::info!(index = job.spec.index, command = %job.spec.command, "deadline expired, killing job");
            let _ = job.child.start_kill();
            job.killed = true;
        }
    }

    /// Reap the first job in insertion order that reports an exit status.
    /// Emits its log record and releases its cost. Returns false when no
    /// active job has exited yet.
    async fn try_reap(
        active: &mut Vec<RunningJob>,
        ledger: &mut CpuLedger,
        logger: &mut BatchLogger,
        records: &mut Vec<LogRecord>,
    ) -> bool {
        let mut exited = None;
        for (slot, job) in active.iter_mut().enumerate() {
            match job.child.try_wait() {
                Ok(Some(status)) => {
                    exited = Some((slot, status));
                    break;
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(index = job.spec.index, %error, "failed to poll job status");
                }
            }
        }
        let Some((slot, status)) = exited else {
            return false;
        };

        let job = active.remove(slot);
        let cost = job.spec.cost;
        let kind = if job.killed {
            TerminationKind::TimedOut
        } else {
            TerminationKind::Completed
        };
        let stdout = job.stdout_task.await.unwrap_or_default();
        let stderr = job.stderr_task.await.unwrap_or_default();

        let record = LogRecord {
            index: job.spec.index,
            command: job.spec.command,
            stdout,
            stderr,
            kind,
            exit_code: status.code(),
            launched_at: job.launched_at,
            finished_at: Utc::now(),
        };

        ledger.release(cost);
        tracing::info!(
            index = record.index,
            kind = %record.kind,
            exit_code = ?record.exit_code,
            used = ledger.used(),
            "reaped job"
        );
        if let Err(error) = logger.append(&record) {
            tracing::warn!(index = record.index, %error, "failed to write log record");
        }
        records.push(record);
        true
    }
}
