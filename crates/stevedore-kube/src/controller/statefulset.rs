//! StatefulSet-backed controller for stateful pods

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Client;
use kube::api::Api;

use super::{DeployOptions, PodController};
use crate::error::Result;
use crate::pods::list_pods_by_labels;

pub struct StatefulSetController {
    client: Client,
    container: Container,
    options: DeployOptions,
}

impl StatefulSetController {
    pub fn new(client: Client, container: Container, options: DeployOptions) -> Self {
        Self {
            client,
            container,
            options,
        }
    }

    /// Desired StatefulSet object; the governing service shares the workload name
    pub fn manifest(&self) -> StatefulSet {
        let opts = &self.options;
        StatefulSet {
            metadata: ObjectMeta {
                name: Some(opts.name.clone()),
                namespace: Some(opts.namespace.clone()),
                labels: Some(opts.labels.clone()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(opts.replicas),
                service_name: opts.name.clone().into(),
                selector: LabelSelector {
                    match_labels: Some(opts.pod_labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(opts.pod_labels.clone()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![self.container.clone()],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn api(&self) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), &self.options.namespace)
    }
}

#[async_trait]
impl PodController for StatefulSetController {
    fn kind(&self) -> &'static str {
        "StatefulSet"
    }

    async fn deploy_or_update(&self) -> Result<()> {
        super::converge(&self.api(), &self.options.name, self.manifest()).await?;
        Ok(())
    }

    async fn get_pods(&self) -> Result<Vec<Pod>> {
        list_pods_by_labels(&self.client, &self.options.namespace, &self.options.pod_labels).await
    }

    async fn delete(&self) -> Result<()> {
        super::delete_foreground(&self.api(), &self.options.name).await
    }

    async fn exists(&self) -> Result<bool> {
        super::exists(&self.api(), &self.options.name).await
    }
}
