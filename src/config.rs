use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one batch run.
///
/// `capacity` is the total CPU budget shared by all concurrently running
/// jobs. Each job is charged its cost on launch and credited back when it is
/// reaped.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Total CPU budget available to the batch.
    pub capacity: u64,
    /// Per-job CPU costs. Shorter lists are padded with 1s, longer lists are
    /// truncated to the job count. `None` means every job costs 1.
    pub weights: Option<Vec<u32>>,
    /// Environment applied to every job. When set, the child environment is
    /// replaced by this map; when unset, children inherit the parent
    /// environment.
    pub env: Option<HashMap<String, String>>,
    /// Shared timeout measured from each job's own launch. Jobs still
    /// running past their deadline are killed. `None` disables deadlines.
    pub timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            weights: None,
            env: None,
            timeout: None,
        }
    }
}

impl BatchConfig {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_weights(mut self, weights: Vec<u32>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Destination for per-job log records.
#[derive(Debug, Clone, Default)]
pub enum LogOutput {
    /// Human-readable records on standard output.
    #[default]
    Stdout,
    /// Human-readable records appended to a file.
    File(PathBuf),
    /// Discard records (the batch report still carries them).
    Null,
}
