//! Container engine client construction
//!
//! An explicit host is tried first. When none is configured, or the given
//! host cannot be used, the client falls back to the environment defaults
//! (`DOCKER_HOST`, then the local socket).

use std::time::Duration;

use bollard::{API_DEFAULT_VERSION, Docker};

use crate::error::{DockerError, Result};

/// Default request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Where the container engine lives
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine address: `unix://`, `tcp://` or `http://`
    pub host: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Build an engine client for the given configuration
pub fn connect(config: &EngineConfig) -> Result<Docker> {
    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        match connect_to_host(host, config.timeout_secs) {
            Ok(docker) => {
                tracing::debug!(host, "using explicit engine host");
                return Ok(docker);
            }
            Err(e) => {
                tracing::warn!(host, error = %e, "cannot use engine host, falling back to environment defaults");
            }
        }
    }

    Docker::connect_with_defaults()
        .map(|docker| docker.with_timeout(Duration::from_secs(config.timeout_secs)))
        .map_err(|e| DockerError::Connection(e.to_string()))
}

/// Connect to an explicit host address
pub fn connect_to_host(host: &str, timeout_secs: u64) -> Result<Docker> {
    if host.starts_with("unix://") {
        return connect_unix(host, timeout_secs);
    }
    if host.starts_with("tcp://") || host.starts_with("http://") {
        return Ok(Docker::connect_with_http(
            host,
            timeout_secs,
            API_DEFAULT_VERSION,
        )?);
    }
    Err(DockerError::InvalidConfig(format!(
        "unsupported engine host '{}' (expected unix://, tcp:// or http://)",
        host
    )))
}

#[cfg(unix)]
fn connect_unix(host: &str, timeout_secs: u64) -> Result<Docker> {
    Ok(Docker::connect_with_unix(
        host,
        timeout_secs,
        API_DEFAULT_VERSION,
    )?)
}

#[cfg(not(unix))]
fn connect_unix(host: &str, _timeout_secs: u64) -> Result<Docker> {
    Err(DockerError::InvalidConfig(format!(
        "unix sockets are not supported on this platform: {}",
        host
    )))
}
