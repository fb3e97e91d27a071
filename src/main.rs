use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use procbatch::config::{BatchConfig, LogOutput};
use procbatch::logger::BatchLogger;
use procbatch::scheduler::{BatchReport, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "procbatch")]
#[command(version)]
#[command(about = "Runs a batch of external jobs under a fixed CPU budget")]
struct Args {
    /// Job command lines, in submission order
    #[arg(value_name = "COMMAND")]
    jobs: Vec<String>,

    /// Read job command lines from a file, one per line.
    /// Blank lines and lines starting with '#' are ignored.
    #[arg(long, value_name = "PATH", conflicts_with = "jobs")]
    jobs_file: Option<PathBuf>,

    /// Total CPU budget shared by concurrently running jobs
    #[arg(long, short = 'c', default_value = "1")]
    capacity: u64,

    /// Comma-separated per-job CPU costs.
    /// Shorter lists are padded with 1s, longer lists truncated.
    #[arg(long, value_delimiter = ',', value_name = "COST")]
    weights: Option<Vec<u32>>,

    /// Shared timeout in seconds, measured from each job's own launch
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Environment entry applied to every job (repeatable).
    /// When present, replaces the inherited environment entirely.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Write per-job output logs to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Summary output format
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Summary Output
// =============================================================================

#[derive(Serialize)]
struct JobSummary {
    index: usize,
    command: String,
    status: String,
    exit_code: Option<i32>,
    stdout_bytes: usize,
    stderr_bytes: usize,
    launched_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
struct SkipSummary {
    index: usize,
    command: String,
    reason: String,
}

#[derive(Serialize)]
struct BatchSummary {
    completed: usize,
    timed_out: usize,
    skipped: usize,
    jobs: Vec<JobSummary>,
    skips: Vec<SkipSummary>,
}

impl BatchSummary {
    fn from_report(report: &BatchReport) -> Self {
        Self {
            completed: report.records.len() - report.timed_out(),
            timed_out: report.timed_out(),
            skipped: report.skipped.len(),
            jobs: report
                .records
                .iter()
                .map(|r| JobSummary {
                    index: r.index,
                    command: r.command.clone(),
                    status: r.kind.to_string(),
                    exit_code: r.exit_code,
                    stdout_bytes: r.stdout.len(),
                    stderr_bytes: r.stderr.len(),
                    launched_at: r.launched_at,
                    finished_at: r.finished_at,
                })
                .collect(),
            skips: report
                .skipped
                .iter()
                .map(|s| SkipSummary {
                    index: s.index,
                    command: s.command.clone(),
                    reason: s.error.to_string(),
                })
                .collect(),
        }
    }
}

fn print_summary(report: &BatchReport, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let summary = BatchSummary::from_report(report);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            println!("Batch Summary");
            println!("{}", "=".repeat(50));
            println!("Completed: {}", summary.completed);
            println!("Timed out: {}", summary.timed_out);
            println!("Skipped:   {}", summary.skipped);
            println!();
            println!("{:<6} {:<11} {:<6} COMMAND", "INDEX", "STATUS", "EXIT");
            println!("{}", "-".repeat(50));
            for job in &summary.jobs {
                let exit = job
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<6} {:<11} {:<6} {}",
                    job.index, job.status, exit, job.command
                );
            }
            for skip in &summary.skips {
                println!("{:<6} {:<11} {:<6} {}", skip.index, "skipped", "-", skip.command);
                println!("       reason: {}", skip.reason);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Argument Resolution
// =============================================================================

fn load_jobs(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.jobs_file {
        let text = std::fs::read_to_string(path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect())
    } else {
        Ok(args.jobs.clone())
    }
}

fn parse_env(entries: &[String]) -> Result<Option<HashMap<String, String>>, String> {
    if entries.is_empty() {
        return Ok(None);
    }
    let mut env = HashMap::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid --env entry (expected KEY=VALUE): {entry}"))?;
        env.insert(key.to_string(), value.to_string());
    }
    Ok(Some(env))
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let jobs = load_jobs(&args)?;
    if jobs.is_empty() {
        return Err("no jobs given (pass commands or --jobs-file)".into());
    }
    if args.capacity == 0 {
        return Err("--capacity must be positive".into());
    }

    let mut config = BatchConfig::new(args.capacity);
    if let Some(weights) = args.weights.clone() {
        config = config.with_weights(weights);
    }
    if let Some(env) = parse_env(&args.env)? {
        config = config.with_env(env);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    // With the summary on stdout, per-job logs default there too unless a
    // file is given.
    let log_output = args
        .log_file
        .clone()
        .map(LogOutput::File)
        .unwrap_or_default();
    let logger = BatchLogger::from_output(&log_output)?;

    let mut scheduler = Scheduler::new(config, logger);
    let report = scheduler.run(&jobs).await;

    print_summary(&report, args.output)?;
    Ok(())
}
