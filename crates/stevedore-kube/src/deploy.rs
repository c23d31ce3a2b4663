//! Pod deploys
//!
//! A deploy turns a [`PodSpec`] into a container, picks the workload
//! controller and converges it, optionally waiting for a pod to become
//! ready. All cluster work runs in one spawned task raced against the
//! deploy deadline; when the deadline wins the task is aborted and
//! [`KubeError::DeployTimeout`] is returned. Nothing is rolled back.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use kube::Client;

use crate::client::DEFAULT_NAMESPACE;
use crate::controller::{DeployOptions, select_controller};
use crate::error::{KubeError, Result};
use crate::readiness::wait_for_ready;
use crate::spec::{PodSpec, build_container};

/// Deadline used when none (or zero) is given
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10 * 60);

/// Options for [`deploy_pod`]
#[derive(Debug, Clone)]
pub struct PodDeployOptions {
    /// Base labels, applied to the workload and merged into the pod labels
    pub labels: BTreeMap<String, String>,

    /// Desired replica count
    pub replicas: i32,

    /// Deploy as a StatefulSet instead of a Deployment
    pub stateful: bool,

    /// Target namespace
    pub namespace: String,

    /// Deadline for the whole deploy
    pub duration: Duration,

    /// Wait for a pod to become ready before returning
    pub wait_ready: bool,

    /// What to run
    pub spec: PodSpec,
}

impl PodDeployOptions {
    /// Deploy one replica of `spec` into the default namespace
    pub fn new(spec: PodSpec) -> Self {
        Self {
            labels: BTreeMap::new(),
            replicas: 1,
            stateful: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
            duration: DEFAULT_DURATION,
            wait_ready: false,
            spec,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_wait_ready(mut self, wait_ready: bool) -> Self {
        self.wait_ready = wait_ready;
        self
    }

    /// Fill in the default deadline and namespace
    pub fn normalize(mut self) -> Self {
        if self.duration.is_zero() {
            self.duration = DEFAULT_DURATION;
        }
        if self.namespace.is_empty() {
            self.namespace = DEFAULT_NAMESPACE.to_string();
        }
        self
    }

    /// Pod template labels: base labels overlaid with the pod spec's labels
    pub fn pod_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels.clone();
        labels.extend(
            self.spec
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        labels
    }

    /// Options handed to the workload controller
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            name: self.spec.name.clone(),
            labels: self.labels.clone(),
            pod_labels: self.pod_labels(),
            replicas: self.replicas,
            namespace: self.namespace.clone(),
        }
    }
}

/// Outcome of a successful deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Workload kind that was converged
    pub kind: &'static str,

    pub name: String,

    pub namespace: String,

    /// Status message of the last failed pod seen while waiting for readiness
    pub failure_message: Option<String>,
}

/// Run `task` on its own tokio task, failing with `DeployTimeout` if it
/// does not finish within `duration`
///
/// On timeout the task is aborted.
pub async fn run_with_deadline<F, T>(duration: Duration, task: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(task);

    tokio::select! {
        biased;

        _ = tokio::time::sleep(duration) => {
            handle.abort();
            Err(KubeError::DeployTimeout)
        }
        joined = &mut handle => match joined {
            Ok(result) => result,
            Err(e) => Err(KubeError::TaskFailed(e.to_string())),
        },
    }
}

/// Deploy a pod workload and converge it to the desired state
///
/// Quota errors are reported before any request reaches the cluster.
pub async fn deploy_pod(client: &Client, options: PodDeployOptions) -> Result<DeployReport> {
    let options = options.normalize();
    let container = build_container(&options.spec)?;

    let pod_labels = options.pod_labels();
    let controller = select_controller(
        client.clone(),
        container,
        options.deploy_options(),
        options.stateful,
    );

    let kind = controller.kind();
    let name = options.spec.name.clone();
    let namespace = options.namespace.clone();
    tracing::info!(
        kind,
        name = %name,
        namespace = %namespace,
        timeout_secs = options.duration.as_secs(),
        "deploying pod workload"
    );

    let wait_ready = options.wait_ready;
    let watch_client = client.clone();
    let watch_namespace = namespace.clone();
    let failure_message = run_with_deadline(options.duration, async move {
        controller.deploy_or_update().await?;
        if wait_ready {
            wait_for_ready(&watch_client, &watch_namespace, &pod_labels).await
        } else {
            Ok(None)
        }
    })
    .await?;

    tracing::debug!(kind, name = %name, "deploy finished");
    Ok(DeployReport {
        kind,
        name,
        namespace,
        failure_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_client, not_found, object};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEB: &str = "/apis/apps/v1/namespaces/default/deployments/web";

    fn web_spec() -> PodSpec {
        PodSpec::new("web", "nginx:1.17")
    }

    #[test]
    fn test_normalize_defaults() {
        let options = PodDeployOptions::new(web_spec())
            .with_namespace("")
            .with_duration(Duration::ZERO)
            .normalize();

        assert_eq!(options.namespace, "default");
        assert_eq!(options.duration, DEFAULT_DURATION);
        assert_eq!(DEFAULT_DURATION, Duration::from_secs(600));
    }

    #[test]
    fn test_normalize_keeps_explicit_values() {
        let options = PodDeployOptions::new(web_spec())
            .with_namespace("apps")
            .with_duration(Duration::from_secs(30))
            .normalize();

        assert_eq!(options.namespace, "apps");
        assert_eq!(options.duration, Duration::from_secs(30));
    }

    #[test]
    fn test_pod_labels_spec_wins() {
        let mut spec = web_spec();
        spec.labels.insert("tier".to_string(), "frontend".to_string());
        spec.labels.insert("app".to_string(), "override".to_string());

        let options = PodDeployOptions::new(spec)
            .with_label("app", "web")
            .with_label("team", "core");

        let labels = options.pod_labels();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["app"], "override");
        assert_eq!(labels["team"], "core");
        assert_eq!(labels["tier"], "frontend");

        let deploy = options.deploy_options();
        assert_eq!(deploy.name, "web");
        assert_eq!(deploy.labels.len(), 2);
        assert_eq!(deploy.labels["app"], "web");
        assert_eq!(deploy.pod_labels, labels);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_beats_slow_task() {
        let err = run_with_deadline(Duration::from_millis(1), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, KubeError>(())
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_result_returned_before_deadline() {
        let value = run_with_deadline(Duration::from_secs(60), async { Ok::<_, KubeError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = run_with_deadline(Duration::from_secs(60), async {
            Err::<(), _>(KubeError::WatchClosed)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, KubeError::WatchClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_task_is_aborted() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result = run_with_deadline(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, KubeError>(())
        })
        .await;
        assert!(result.unwrap_err().is_timeout());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_task_reports_failure() {
        fn explode() -> Result<()> {
            panic!("boom")
        }

        let err = run_with_deadline(Duration::from_secs(5), async { explode() })
        .await
        .unwrap_err();
        assert!(matches!(err, KubeError::TaskFailed(_)));
    }

    #[tokio::test]
    async fn test_bad_quota_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut spec = web_spec();
        spec.quota.cpu = Some("a lot".to_string());

        let err = deploy_pod(&mock_client(&server), PodDeployOptions::new(spec))
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::InvalidQuantity { .. }));
    }

    #[tokio::test]
    async fn test_second_deploy_updates_instead_of_creating() {
        let server = MockServer::start().await;
        let body = object("apps/v1", "Deployment", "web", "default");

        // First GET misses, every later GET finds the object
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(not_found("deployments.apps", "web"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/apps/v1/namespaces/default/deployments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(WEB))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        for _ in 0..2 {
            let report = deploy_pod(&client, PodDeployOptions::new(web_spec()))
                .await
                .unwrap();
            assert_eq!(report.kind, "Deployment");
            assert_eq!(report.name, "web");
            assert_eq!(report.namespace, "default");
            assert_eq!(report.failure_message, None);
        }
    }

    #[tokio::test]
    async fn test_stateful_deploy_uses_statefulset() {
        let server = MockServer::start().await;
        let body = object("apps/v1", "StatefulSet", "web", "apps");
        Mock::given(method("GET"))
            .and(path("/apis/apps/v1/namespaces/apps/statefulsets/web"))
            .respond_with(not_found("statefulsets.apps", "web"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/apis/apps/v1/namespaces/apps/statefulsets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let options = PodDeployOptions::new(web_spec())
            .with_stateful(true)
            .with_namespace("apps");
        let report = deploy_pod(&mock_client(&server), options).await.unwrap();
        assert_eq!(report.kind, "StatefulSet");
    }

    #[tokio::test]
    async fn test_slow_cluster_hits_deploy_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEB))
            .respond_with(not_found("deployments.apps", "web").set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let options = PodDeployOptions::new(web_spec()).with_duration(Duration::from_millis(100));
        let err = deploy_pod(&mock_client(&server), options)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "deploy timeout");
    }
}
