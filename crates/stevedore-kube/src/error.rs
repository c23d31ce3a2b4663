//! Error types for stevedore-kube

use thiserror::Error;

/// Result type for stevedore-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during Kubernetes operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be read or resolved
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Malformed CPU/memory quantity in a pod quota
    #[error("invalid {resource} quantity '{value}'")]
    InvalidQuantity { resource: String, value: String },

    /// The deploy deadline expired before the deploy task finished
    #[error("deploy timeout")]
    DeployTimeout,

    /// The pod watch stream ended before any pod became ready
    #[error("pod watch stream closed before a pod became ready")]
    WatchClosed,

    /// Error reported by the pod watcher
    #[error("pod watch error: {0}")]
    Watch(#[from] kube::runtime::watcher::Error),

    /// The background deploy task panicked or was cancelled
    #[error("deploy task failed: {0}")]
    TaskFailed(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }

    /// Check if this is the deploy deadline sentinel
    pub fn is_timeout(&self) -> bool {
        matches!(self, KubeError::DeployTimeout)
    }
}
