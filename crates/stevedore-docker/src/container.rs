//! One-shot container runs
//!
//! A run creates a container, starts it, waits for it to stop, collects its
//! combined stdout/stderr and exit code, and always force-removes it
//! afterwards. Removal failures are logged and otherwise ignored. A run that
//! is dropped before it finishes still removes its container from a spawned
//! task.

use std::collections::BTreeMap;
use std::time::Duration;

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use futures::StreamExt;

use crate::client::{EngineConfig, connect};
use crate::error::{DockerError, Result};

/// Resource limits applied to the container's host config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory limit in bytes
    pub memory: Option<i64>,

    /// Memory plus swap limit in bytes (`-1` for unlimited swap)
    pub memory_swap: Option<i64>,

    /// CPU quota in units of 1e-9 CPUs
    pub nano_cpus: Option<i64>,

    /// Relative CPU weight
    pub cpu_shares: Option<i64>,

    /// Maximum number of processes
    pub pids_limit: Option<i64>,
}

impl ResourceLimits {
    /// Limit to a fractional number of CPUs
    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.nano_cpus = Some((cpus * 1e9) as i64);
        self
    }

    pub fn with_memory(mut self, bytes: i64) -> Self {
        self.memory = Some(bytes);
        self
    }

    fn apply(&self, host_config: &mut HostConfig) {
        host_config.memory = self.memory;
        host_config.memory_swap = self.memory_swap;
        host_config.nano_cpus = self.nano_cpus;
        host_config.cpu_shares = self.cpu_shares;
        host_config.pids_limit = self.pids_limit;
    }
}

/// What to run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Image reference
    pub image: String,

    /// Command and arguments (image default when empty)
    pub cmd: Vec<String>,

    /// Working directory inside the container
    pub work_dir: Option<String>,

    /// Environment variables
    pub env: BTreeMap<String, String>,

    /// Bind mounts, host path to container path
    pub mounts: BTreeMap<String, String>,

    pub limits: Option<ResourceLimits>,

    /// Upper bound on how long to wait for the container to stop
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<String>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_mount(mut self, host: impl Into<String>, container: impl Into<String>) -> Self {
        self.mounts.insert(host.into(), container.into());
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Engine-side container configuration
    pub fn container_config(&self) -> Config<String> {
        let mut host_config = HostConfig::default();

        if !self.mounts.is_empty() {
            host_config.mounts = Some(
                self.mounts
                    .iter()
                    .map(|(source, target)| Mount {
                        source: Some(source.clone()),
                        target: Some(target.clone()),
                        typ: Some(MountTypeEnum::BIND),
                        ..Default::default()
                    })
                    .collect(),
            );
        }
        if let Some(limits) = &self.limits {
            limits.apply(&mut host_config);
        }

        Config {
            image: Some(self.image.clone()),
            cmd: (!self.cmd.is_empty()).then(|| self.cmd.clone()),
            working_dir: self.work_dir.clone().filter(|dir| !dir.is_empty()),
            env: (!self.env.is_empty()).then(|| {
                self.env
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect()
            }),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Combined stdout and stderr
    pub output: String,

    pub exit_code: i64,
}

/// Connect with `engine` and run one container
pub async fn run_container(engine: &EngineConfig, options: &RunOptions) -> Result<RunOutput> {
    let docker = connect(engine)?;
    run(&docker, options).await
}

/// Run one container to completion on an existing client
pub async fn run(docker: &Docker, options: &RunOptions) -> Result<RunOutput> {
    let created = docker
        .create_container(None::<CreateContainerOptions<String>>, options.container_config())
        .await?;
    let id = created.id;
    for warning in &created.warnings {
        tracing::warn!(container = %id, "{}", warning);
    }
    tracing::debug!(container = %id, image = %options.image, "container created");

    let mut guard = RemoveOnDrop::new(docker, &id);
    let result = run_created(docker, &id, options.timeout).await;
    remove(docker, &id).await;
    guard.disarm();
    result
}

/// Removes the container in the background if the run is dropped early
struct RemoveOnDrop {
    docker: Docker,
    id: Option<String>,
}

impl RemoveOnDrop {
    fn new(docker: &Docker, id: &str) -> Self {
        Self {
            docker: docker.clone(),
            id: Some(id.to_string()),
        }
    }

    fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(container = %id, "run cancelled, removing container");
                let docker = self.docker.clone();
                handle.spawn(async move { remove(&docker, &id).await });
            }
            Err(_) => {
                tracing::warn!(container = %id, "run dropped outside a runtime, container left behind");
            }
        }
    }
}

async fn run_created(docker: &Docker, id: &str, timeout: Option<Duration>) -> Result<RunOutput> {
    docker
        .start_container(id, None::<StartContainerOptions<String>>)
        .await?;
    tracing::debug!(container = %id, "container started");

    match timeout {
        Some(limit) => tokio::time::timeout(limit, wait_not_running(docker, id))
            .await
            .map_err(|_| DockerError::Timeout(limit))??,
        None => wait_not_running(docker, id).await?,
    }

    let output = collect_logs(docker, id).await?;

    let inspected = docker
        .inspect_container(id, None::<InspectContainerOptions>)
        .await?;
    let exit_code = inspected
        .state
        .and_then(|state| state.exit_code)
        .unwrap_or_default();
    tracing::debug!(container = %id, exit_code, "container finished");

    Ok(RunOutput { output, exit_code })
}

async fn wait_not_running(docker: &Docker, id: &str) -> Result<()> {
    let options = WaitContainerOptions {
        condition: "not-running",
    };
    let mut stream = std::pin::pin!(docker.wait_container(id, Some(options)));

    while let Some(item) = stream.next().await {
        match item {
            Ok(_) => {}
            // A non-zero exit is reported through the error channel
            Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                tracing::debug!(container = %id, code, "container exited with non-zero status");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn collect_logs(docker: &Docker, id: &str) -> Result<String> {
    let options = LogsOptions::<String> {
        stdout: true,
        stderr: true,
        tail: "all".to_string(),
        ..Default::default()
    };
    let mut stream = std::pin::pin!(docker.logs(id, Some(options)));

    let mut output = Vec::new();
    while let Some(chunk) = stream.next().await {
        output.extend_from_slice(&chunk?.into_bytes());
    }
    Ok(String::from_utf8_lossy(&output).into_owned())
}

async fn remove(docker: &Docker, id: &str) {
    let options = RemoveContainerOptions {
        force: true,
        ..Default::default()
    };
    match docker.remove_container(id, Some(options)).await {
        Ok(()) => tracing::debug!(container = %id, "container removed"),
        Err(e) => tracing::debug!(container = %id, error = %e, "failed to remove container"),
    }
}
