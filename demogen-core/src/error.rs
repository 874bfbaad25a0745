//! Error types for Demogen

use thiserror::Error;

/// Result type alias for Demogen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Demogen operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git operation error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persisted branch counter could not be parsed
    #[error("Counter file error: {0}")]
    Counter(String),

    /// An external command exited with a nonzero status
    #[error("Error running command: {command}\n{stderr}")]
    Command {
        /// The command line that was run
        command: String,
        /// Captured standard error of the command
        stderr: String,
    },

    /// An external command ran past its configured timeout
    #[error("Command timed out: {command}")]
    Timeout {
        /// The command line that was run
        command: String,
    },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
