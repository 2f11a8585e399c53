use std::time::Duration;

/// Errors that can occur while locating a stream or recording its samples.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("No stream named '{name}' found within {timeout:?}")]
    StreamNotFound { name: String, timeout: Duration },

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ListenerError {
    /// Process exit status for this error.
    ///
    /// A missing stream and an interrupt during discovery both exit with 1;
    /// everything that fails before or outside the logging loop exits with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            ListenerError::StreamNotFound { .. } | ListenerError::Interrupted => 1,
            _ => 2,
        }
    }
}
