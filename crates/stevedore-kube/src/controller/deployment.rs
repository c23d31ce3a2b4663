//! Deployment-backed controller for stateless pods

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Client;
use kube::api::Api;

use super::{DeployOptions, PodController};
use crate::error::Result;
use crate::pods::list_pods_by_labels;

pub struct DeploymentController {
    client: Client,
    container: Container,
    options: DeployOptions,
}

impl DeploymentController {
    pub fn new(client: Client, container: Container, options: DeployOptions) -> Self {
        Self {
            client,
            container,
            options,
        }
    }

    /// Desired Deployment object
    pub fn manifest(&self) -> Deployment {
        let opts = &self.options;
        Deployment {
            metadata: ObjectMeta {
                name: Some(opts.name.clone()),
                namespace: Some(opts.namespace.clone()),
                labels: Some(opts.labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(opts.replicas),
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

    fn api(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.options.namespace)
    }
}

#[async_trait]
impl PodController for DeploymentController {
    fn kind(&self) -> &'static str {
        "Deployment"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{deleted, mock_client, not_found, object, status_response};
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEPLOYMENTS: &str = "/apis/apps/v1/namespaces/default/deployments";
    const WEB: &str = "/apis/apps/v1/namespaces/default/deployments/web";

    fn controller(client: Client) -> DeploymentController {
        let mut pod_labels = BTreeMap::new();
        pod_labels.insert("app".to_string(), "web".to_string());
        let mut labels = BTreeMap::new();
        labels.insert("team".to_string(), "core".to_string());

        let container = Container {
            name: "web".to_string(),
            image: Some("nginx:1.17".to_string()),
            ..Default::default()
        };
        let options = DeployOptions {
            name: "web".to_string(),
            labels,
            pod_labels,
            replicas: 2,
            namespace: "default".to_string(),
        };
        DeploymentController::new(client, container, options)
    }

    fn deployment_body() -> serde_json::Value {
        object("apps/v1", "Deployment", "web", "default")
    }

    #[tokio::test]
    async fn test_manifest_shape() {
        let server = MockServer::start().await;
        let deployment = controller(mock_client(&server)).manifest();

        assert_eq!(deployment.metadata.name.as_deref(), Some("web"));
        assert_eq!(deployment.metadata.labels.as_ref().unwrap()["team"], "core");

        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.selector.match_labels.as_ref().unwrap()["app"], "web");

        let template_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(template_labels["app"], "web");

        let containers = spec.template.spec.unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].image.as_deref(), Some("nginx:1.17"));
    }

    #[tokio::test]
    async fn test_deploy_creates_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(not_found("deployments.apps", "web"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEPLOYMENTS))
            .and(body_partial_json(serde_json::json!({
                "metadata": { "name": "web" },
                "spec": { "replicas": 2 }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(deployment_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .expect(0)
            .mount(&server)
            .await;

        controller(mock_client(&server))
            .deploy_or_update()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deploy_replaces_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(WEB))
            .and(body_partial_json(serde_json::json!({
                "metadata": { "name": "web", "resourceVersion": "42" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(deployment_body()))
            .expect(0)
            .mount(&server)
            .await;

        controller(mock_client(&server))
            .deploy_or_update()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deploy_propagates_other_get_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(status_response(403, "Forbidden", "nope"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(deployment_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = controller(mock_client(&server))
            .deploy_or_update()
            .await
            .unwrap_err();
        assert!(
            matches!(err, crate::KubeError::Api(kube::Error::Api(ref resp)) if resp.code == 403)
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/apps/v1/namespaces/default/deployments/other"))
            .respond_with(not_found("deployments.apps", "other"))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        assert!(controller(client.clone()).exists().await.unwrap());

        let mut missing = controller(client);
        missing.options.name = "other".to_string();
        assert!(!missing.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_uses_foreground_propagation() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(WEB))
            .and(body_partial_json(serde_json::json!({
                "propagationPolicy": "Foreground"
            })))
            .respond_with(deleted())
            .expect(1)
            .mount(&server)
            .await;

        controller(mock_client(&server)).delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_pods_uses_template_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/default/pods"))
            .and(query_param("labelSelector", "app=web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "apiVersion": "v1",
                "kind": "PodList",
                "metadata": {},
                "items": [{ "metadata": { "name": "web-abc" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pods = controller(mock_client(&server)).get_pods().await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("web-abc"));
    }
}
