//! Stevedore Kube - Kubernetes integration for Stevedore
//!
//! This crate provides:
//! - **Client Factory**: Build clients from an explicit kubeconfig path, context and namespace
//! - **Workload Controllers**: Deployment and StatefulSet backends behind one `PodController` trait
//! - **Pod Deploys**: Converge a pod spec to the cluster under a single deadline
//! - **Readiness Watching**: Wait for a pod to reach Running/Succeeded via the runtime watcher
//! - **Services**: Delete-and-recreate service management
//! - **Pod Listing**: Label and selector based pod queries

pub mod client;
pub mod controller;
pub mod deploy;
pub mod error;
pub mod pods;
pub mod quantity;
pub mod readiness;
pub mod service;
pub mod spec;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ClientConfig, DEFAULT_NAMESPACE, NamespacedClient, connect};
pub use controller::{
    DeployOptions, DeploymentController, PodController, StatefulSetController, select_controller,
};
pub use deploy::{DEFAULT_DURATION, DeployReport, PodDeployOptions, deploy_pod, run_with_deadline};
pub use error::{KubeError, Result};
pub use pods::{label_selector, list_pods_by_labels, list_pods_by_selector, pod_phase};
pub use quantity::parse_quantity;
pub use readiness::{PodReadiness, wait_for_ready};
pub use service::{ServiceOptions, ServiceType, build_service, service_ports};
pub use spec::{Cmd, Port, PodSpec, Protocol, Quota, build_container, container_ports};
