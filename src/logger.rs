use std::fs::File;
use std::io::{self, Write};

use crate::config::LogOutput;
use crate::scheduler::job::{LogRecord, TerminationKind};

/// Appends one human-readable block per reaped job to a sink.
///
/// Records are write-once and never updated. Writing happens synchronously
/// on the scheduler loop; the cost is format-and-write only.
pub struct BatchLogger {
    sink: Option<Box<dyn Write + Send>>,
}

impl BatchLogger {
    /// Log to standard output (the default).
    pub fn stdout() -> Self {
        Self {
            sink: Some(Box::new(io::stdout())),
        }
    }

    /// Discard records; the batch report still carries them.
    pub fn null() -> Self {
        Self { sink: None }
    }

    /// Log to a caller-provided writer.
    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self { sink: Some(writer) }
    }

    pub fn from_output(output: &LogOutput) -> io::Result<Self> {
        match output {
            LogOutput::Stdout => Ok(Self::stdout()),
            LogOutput::Null => Ok(Self::null()),
            LogOutput::File(path) => {
                let file = File::create(path)?;
                tracing::debug!(path = %path.display(), "opened log file");
                Ok(Self::to_writer(Box::new(file)))
            }
        }
    }

    /// Append one record. Timed-out jobs log `Errors: Timeout` in place of
    /// the captured stderr.
    pub fn append(&mut self, record: &LogRecord) -> io::Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        writeln!(sink, "==> Subprocess: {}", record.command)?;
        writeln!(sink, "--> Outputs:")?;
        write_block(sink, &record.stdout)?;
        match record.kind {
            TerminationKind::TimedOut => writeln!(sink, "--> Errors: Timeout")?,
            TerminationKind::Completed => {
                writeln!(sink, "--> Errors: {}", record.stderr.len())?;
                write_block(sink, &record.stderr)?;
            }
        }
        writeln!(sink)?;
        sink.flush()
    }
}

/// Write captured bytes, newline-terminated unless empty.
fn write_block(sink: &mut (dyn Write + Send), bytes: &[u8]) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    sink.write_all(bytes)?;
    if !bytes.ends_with(b"\n") {
        writeln!(sink)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(kind: TerminationKind, stdout: &[u8], stderr: &[u8]) -> LogRecord {
        let now = Utc::now();
        LogRecord {
            index: 0,
            command: "echo hello".to_string(),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
            kind,
            exit_code: Some(0),
            launched_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn completed_record_format() {
        let buf = SharedBuf::default();
        let mut logger = BatchLogger::to_writer(Box::new(buf.clone()));
        logger
            .append(&record(TerminationKind::Completed, b"hello\n", b"warn"))
            .unwrap();

        let text = buf.contents();
        assert!(text.contains("==> Subprocess: echo hello"));
        assert!(text.contains("--> Outputs:\nhello\n"));
        assert!(text.contains("--> Errors: 4\nwarn\n"));
    }

    #[test]
    fn timed_out_record_replaces_stderr() {
        let buf = SharedBuf::default();
        let mut logger = BatchLogger::to_writer(Box::new(buf.clone()));
        logger
            .append(&record(TerminationKind::TimedOut, b"partial", b"noise"))
            .unwrap();

        let text = buf.contents();
        assert!(text.contains("--> Errors: Timeout"));
        assert!(!text.contains("noise"));
    }

    #[test]
    fn null_logger_swallows_records() {
        let mut logger = BatchLogger::null();
        logger
            .append(&record(TerminationKind::Completed, b"", b""))
            .unwrap();
    }
}
