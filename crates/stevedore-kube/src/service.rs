//! Service management
//!
//! Services are not updated in place: an existing service with the same name
//! is deleted (foreground propagation) and created again from scratch.

use std::collections::BTreeMap;
use std::str::FromStr;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{DeleteParams, PostParams};

use crate::client::NamespacedClient;
use crate::error::{KubeError, Result};
use crate::spec::{Port, container_ports};

/// How the service is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    #[default]
    ClusterIp,
    NodePort,
    LoadBalancer,
    ExternalName,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIp => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
            ServiceType::ExternalName => "ExternalName",
        }
    }
}

impl FromStr for ServiceType {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clusterip" => Ok(ServiceType::ClusterIp),
            "nodeport" => Ok(ServiceType::NodePort),
            "loadbalancer" => Ok(ServiceType::LoadBalancer),
            "externalname" => Ok(ServiceType::ExternalName),
            _ => Err(KubeError::InvalidConfig(format!(
                "unknown service type '{}' (expected ClusterIP, NodePort, LoadBalancer or ExternalName)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired service
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub name: String,

    /// Pods to route to; also set as the service's own labels
    pub labels: BTreeMap<String, String>,

    pub ports: Vec<Port>,

    pub service_type: ServiceType,
}

impl ServiceOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }
}

/// Service ports, normalized like container ports and targeting the same number
pub fn service_ports(ports: &[Port]) -> Vec<ServicePort> {
    container_ports(ports)
        .into_iter()
        .map(|port| ServicePort {
            name: port.name,
            protocol: port.protocol,
            port: port.container_port,
            target_port: Some(IntOrString::Int(port.container_port)),
            ..Default::default()
        })
        .collect()
}

/// Desired Service object
pub fn build_service(options: &ServiceOptions) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(options.name.clone()),
            labels: Some(options.labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(options.service_type.as_str().to_string()),
            selector: Some(options.labels.clone()),
            ports: Some(service_ports(&options.ports)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl NamespacedClient {
    /// Replace the named service with a freshly created one
    ///
    /// Returns the service as read back from the cluster after creation.
    pub async fn create_or_replace_service(&self, options: &ServiceOptions) -> Result<Service> {
        let api = self.api::<Service>();
        let name = options.name.as_str();

        match api.get(name).await {
            Ok(_) => {
                tracing::debug!(name, namespace = self.namespace(), "deleting existing service");
                api.delete(name, &DeleteParams::foreground()).await?;
            }
            Err(kube::Error::Api(resp)) if resp.code == 404 => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(name, namespace = self.namespace(), "creating service");
        api.create(&PostParams::default(), &build_service(options))
            .await?;
        Ok(api.get(name).await?)
    }
}
