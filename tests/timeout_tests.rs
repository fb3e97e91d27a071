use std::time::{Duration, Instant};

use procbatch::config::BatchConfig;
use procbatch::logger::BatchLogger;
use procbatch::scheduler::{BatchReport, Scheduler, TerminationKind};

async fn run_batch(config: BatchConfig, jobs: &[&str]) -> BatchReport {
    let jobs: Vec<String> = jobs.iter().map(|s| s.to_string()).collect();
    let mut scheduler = Scheduler::new(config, BatchLogger::null());
    scheduler.run(&jobs).await
}

#[tokio::test]
async fn overrunning_job_is_killed_and_logged_timed_out() {
    let config = BatchConfig::new(1).with_timeout(Duration::from_millis(500));
    let started = Instant::now();
    let report = run_batch(config, &["sleep 30"]).await;

    assert!(
        started.elapsed() < Duration::from_secs(10),
        "batch should return soon after the deadline, took {:?}",
        started.elapsed()
    );
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].kind, TerminationKind::TimedOut);
    // Killed by signal, so no exit code on Unix.
    assert_eq!(report.records[0].exit_code, None);
}

#[tokio::test]
async fn fast_job_under_timeout_completes_normally() {
    let config = BatchConfig::new(1).with_timeout(Duration::from_secs(30));
    let report = run_batch(config, &["echo hi"]).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].kind, TerminationKind::Completed);
    assert_eq!(report.records[0].stdout_lossy(), "hi\n");
}

#[tokio::test]
async fn deadline_kill_frees_budget_for_queued_jobs() {
    // Job 0 hogs the whole budget until its deadline; job 1 must be admitted
    // only after the kill takes observable effect and job 0 is reaped.
    let config = BatchConfig::new(1).with_timeout(Duration::from_millis(500));
    let started = Instant::now();
    let report = run_batch(config, &["sleep 30", "echo ok"]).await;

    assert!(
        started.elapsed() < Duration::from_secs(10),
        "admission should unblock after the deadline kill, took {:?}",
        started.elapsed()
    );

    let order: Vec<(usize, TerminationKind)> =
        report.records.iter().map(|r| (r.index, r.kind)).collect();
    assert_eq!(
        order,
        vec![(0, TerminationKind::TimedOut), (1, TerminationKind::Completed)]
    );

    // Job 1 launched only after job 0's cost came back to the ledger.
    let killed = &report.records[0];
    let after = &report.records[1];
    assert!(after.launched_at >= killed.finished_at);
}

#[tokio::test]
async fn mixed_batch_reaps_each_job_exactly_once() {
    let config = BatchConfig::new(2).with_timeout(Duration::from_millis(700));
    let report = run_batch(config, &["sleep 30", "true"]).await;

    assert_eq!(report.records.len(), 2);
    let by_index = |i: usize| report.records.iter().find(|r| r.index == i).unwrap();
    assert_eq!(by_index(0).kind, TerminationKind::TimedOut);
    assert_eq!(by_index(1).kind, TerminationKind::Completed);
    assert_eq!(report.timed_out(), 1);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn no_timeout_means_no_deadline() {
    // Without a timeout the batch simply waits jobs out.
    let report = run_batch(BatchConfig::new(2), &["sleep 0.3", "sleep 0.2"]).await;

    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.kind == TerminationKind::Completed));
}
