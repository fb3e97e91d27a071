use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Job cost {cost} exceeds batch capacity {capacity}")]
    OversizedJob { cost: u32, capacity: u64 },

    #[error("Failed to launch {command}: {source}")]
    LaunchFailure {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BatchError>;
