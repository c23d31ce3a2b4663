//! Workload controllers
//!
//! A [`PodController`] owns the lifecycle of one workload object that runs
//! the deployed pods:
//! - **Deployment** for stateless pods
//! - **StatefulSet** for stateful pods
//!
//! Both converge to the desired state the same way: create when absent,
//! full replace when present.

mod deployment;
mod statefulset;

pub use deployment::DeploymentController;
pub use statefulset::StatefulSetController;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// What a controller deploys and where
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Workload name
    pub name: String,

    /// Labels on the workload object itself
    pub labels: BTreeMap<String, String>,

    /// Labels on the pod template (also the selector)
    pub pod_labels: BTreeMap<String, String>,

    /// Desired replica count
    pub replicas: i32,

    /// Target namespace
    pub namespace: String,
}

/// Lifecycle of the workload object backing a pod deploy
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait PodController: Send + Sync {
    /// Workload kind, for reporting
    fn kind(&self) -> &'static str;

    /// Create the workload if absent, replace it if present
    async fn deploy_or_update(&self) -> Result<()>;

    /// Pods currently matching the pod template labels
    async fn get_pods(&self) -> Result<Vec<Pod>>;

    /// Delete the workload with foreground propagation
    async fn delete(&self) -> Result<()>;

    /// Whether the workload object exists
    async fn exists(&self) -> Result<bool>;
}

/// Pick the controller variant for a deploy
pub fn select_controller(
    client: Client,
    container: Container,
    options: DeployOptions,
    stateful: bool,
) -> Box<dyn PodController> {
    if stateful {
        Box::new(StatefulSetController::new(client, container, options))
    } else {
        Box::new(DeploymentController::new(client, container, options))
    }
}

/// GET by name, then CREATE on 404 or full-replace UPDATE when found
///
/// Any other GET error is returned unchanged.
pub(crate) async fn converge<K>(api: &Api<K>, name: &str, mut desired: K) -> Result<K>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    match api.get(name).await {
        Ok(existing) => {
            desired.meta_mut().resource_version = existing.meta().resource_version.clone();
            tracing::debug!(name, "replacing existing workload");
            Ok(api.replace(name, &PostParams::default(), &desired).await?)
        }
        Err(kube::Error::Api(resp)) if resp.code == 404 => {
            tracing::debug!(name, "creating workload");
            Ok(api.create(&PostParams::default(), &desired).await?)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn exists<K>(api: &Api<K>, name: &str) -> Result<bool>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    match api.get(name).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn delete_foreground<K>(api: &Api<K>, name: &str) -> Result<()>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    api.delete(name, &DeleteParams::foreground()).await?;
    Ok(())
}
