//! Declarative pod description and its translation into a container spec

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, ResourceRequirements};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::quantity::parse_quantity;

/// Network protocol of a port, normalized to what Kubernetes accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Parse a protocol name case-insensitively; anything unknown is TCP
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "udp" => Protocol::Udp,
            "sctp" => Protocol::Sctp,
            _ => Protocol::Tcp,
        }
    }

    /// Kubernetes spelling of the protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Sctp => "SCTP",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A port exposed by the pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Port name (`port-<index>` when empty)
    #[serde(default)]
    pub name: String,

    /// Protocol name, case-insensitive (TCP when empty or unknown)
    #[serde(default)]
    pub protocol: String,

    /// Port number
    pub port: i32,
}

impl Port {
    /// Create an unnamed TCP port
    pub fn new(port: i32) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the port name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the port protocol
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Name to use for this port at position `index` in its list
    pub fn resolved_name(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("port-{}", index)
        } else {
            self.name.clone()
        }
    }

    /// Normalized protocol
    pub fn resolved_protocol(&self) -> Protocol {
        Protocol::parse(&self.protocol)
    }
}

/// Entrypoint override for the container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cmd {
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub args: Vec<String>,
}

/// CPU and memory quota, applied as both limits and requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Declarative description of the pod to deploy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Workload and container name
    pub name: String,

    /// Image reference
    pub image: String,

    /// Environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Exposed ports
    #[serde(default)]
    pub ports: Vec<Port>,

    /// Working directory inside the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,

    /// Command and arguments
    #[serde(default)]
    pub cmd: Cmd,

    /// Resource quota
    #[serde(default)]
    pub quota: Quota,

    /// Extra pod template labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl PodSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Default::default()
        }
    }
}

/// Map ports 1:1 onto container ports, defaulting names and protocols
pub fn container_ports(ports: &[Port]) -> Vec<ContainerPort> {
    ports
        .iter()
        .enumerate()
        .map(|(i, port)| ContainerPort {
            name: Some(port.resolved_name(i)),
            protocol: Some(port.resolved_protocol().as_str().to_string()),
            container_port: port.port,
            ..Default::default()
        })
        .collect()
}

/// Build the single container of the pod template
///
/// Fails if a quota value is not a valid quantity.
pub fn build_container(spec: &PodSpec) -> Result<Container> {
    let mut container = Container {
        name: spec.name.clone(),
        image: Some(spec.image.clone()),
        ..Default::default()
    };

    let ports = container_ports(&spec.ports);
    if !ports.is_empty() {
        container.ports = Some(ports);
    }

    if !spec.env.is_empty() {
        container.env = Some(
            spec.env
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                })
                .collect(),
        );
    }

    if let Some(dir) = spec.work_dir.as_ref().filter(|d| !d.is_empty()) {
        container.working_dir = Some(dir.clone());
    }

    if !spec.cmd.command.is_empty() {
        container.command = Some(spec.cmd.command.clone());
    }
    if !spec.cmd.args.is_empty() {
        container.args = Some(spec.cmd.args.clone());
    }

    let mut resources = BTreeMap::new();
    if let Some(cpu) = spec.quota.cpu.as_ref().filter(|c| !c.is_empty()) {
        resources.insert("cpu".to_string(), parse_quantity("cpu", cpu)?);
    }
    if let Some(memory) = spec.quota.memory.as_ref().filter(|m| !m.is_empty()) {
        resources.insert("memory".to_string(), parse_quantity("memory", memory)?);
    }
    if !resources.is_empty() {
        container.resources = Some(ResourceRequirements {
            limits: Some(resources.clone()),
            requests: Some(resources),
            ..Default::default()
        });
    }

    Ok(container)
}
