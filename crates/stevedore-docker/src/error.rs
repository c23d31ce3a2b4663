//! Error types for stevedore-docker

use std::time::Duration;

use thiserror::Error;

/// Result type for stevedore-docker operations
pub type Result<T> = std::result::Result<T, DockerError>;

/// Errors that can occur while talking to the container engine
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DockerError {
    /// No engine client could be constructed
    #[error("cannot connect to container engine: {0}")]
    Connection(String),

    /// Engine API error
    #[error("container engine error: {0}")]
    Api(#[from] bollard::errors::Error),

    /// A build or push stream ended with an error line
    #[error("{message}")]
    StreamFailed {
        /// Message from the final error line
        message: String,
        /// Every log line received before and including the error
        output: String,
    },

    /// The container was still running when the wait timeout expired
    #[error("container did not stop within {0:?}")]
    Timeout(Duration),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to encode a log line
    #[error("failed to encode log line: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockerError {
    /// Log captured before the failure, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            DockerError::StreamFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
