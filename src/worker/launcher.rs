use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{BatchError, Result};
use crate::scheduler::job::{JobSpec, RunningJob};

/// Spawns job processes with captured output.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    /// Environment applied to every child. When set, replaces the inherited
    /// environment entirely; when unset, children inherit the parent's.
    env: Option<HashMap<String, String>>,
}

impl ProcessLauncher {
    pub fn new(env: Option<HashMap<String, String>>) -> Self {
        Self { env }
    }

    /// Start the job's process. The process begins executing immediately and
    /// concurrently with the scheduler loop; its deadline is fixed here from
    /// the shared timeout.
    pub fn launch(&self, spec: &JobSpec, timeout: Option<Duration>) -> Result<RunningJob> {
        let mut cmd = Command::new(&spec.argv[0]);
        cmd.args(&spec.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = &self.env {
            cmd.env_clear();
            cmd.envs(env);
        }

        let mut child = cmd.spawn().map_err(|source| BatchError::LaunchFailure {
            command: spec.command.clone(),
            source,
        })?;

        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());
        let launched_at = Utc::now();
        let deadline = timeout.map(|t| Instant::now() + t);

        tracing::debug!(index = spec.index, pid = ?child.id(), "spawned process");

        Ok(RunningJob {
            spec: spec.clone(),
            child,
            launched_at,
            deadline,
            stdout_task,
            stderr_task,
            killed: false,
        })
    }
}

/// Drain a child pipe to memory in the background.
fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A read error mid-stream keeps whatever arrived before it.
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}
