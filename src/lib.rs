pub mod command;
pub mod config;
pub mod error;
pub mod logger;
pub mod scheduler;
pub mod worker;

pub use config::{BatchConfig, LogOutput};
pub use error::{BatchError, Result};
pub use logger::BatchLogger;
pub use scheduler::{BatchReport, LogRecord, Scheduler, TerminationKind};
