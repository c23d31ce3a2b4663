//! CLI error types with exit code handling
//!
//! Library errors are folded into one diagnostic type that knows which exit
//! code to use.

use miette::Diagnostic;
use stevedore_docker::DockerError;
use stevedore_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid user input (files, flags, quantities)
    #[error("Invalid input: {message}")]
    #[diagnostic(code(stevedore::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Container engine failure
    #[error("Engine error: {message}")]
    #[diagnostic(code(stevedore::cli::engine))]
    Engine {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Kubernetes failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(stevedore::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Deploy deadline expired
    #[error("{message}")]
    #[diagnostic(
        code(stevedore::cli::timeout),
        help("raise --timeout, or check that the image can be pulled and scheduled")
    )]
    Timeout { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(stevedore::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Engine { .. } => exit_codes::ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<DockerError> for CliError {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::InvalidConfig(message) => CliError::input(message),
            DockerError::Io(e) => e.into(),
            DockerError::Connection(message) => CliError::Engine {
                message,
                help: Some("set --host or DOCKER_HOST to a reachable engine".to_string()),
            },
            other => CliError::Engine {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::InvalidQuantity { .. } => CliError::input_with_help(
                err.to_string(),
                "quantities look like 500m, 1.5, 128Mi or 1e3",
            ),
            KubeError::InvalidConfig(message) => CliError::input(message),
            KubeError::DeployTimeout => CliError::Timeout {
                message: err.to_string(),
            },
            KubeError::Kubeconfig(_) => CliError::Cluster {
                message: err.to_string(),
                help: Some("pass --kubeconfig or set KUBECONFIG".to_string()),
            },
            KubeError::Io(e) => e.into(),
            other => CliError::Cluster {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::input_with_help(
            format!("cannot parse pod spec: {}", err),
            "a pod spec needs at least `name` and `image`",
        )
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
