//! Pod readiness watching
//!
//! Pods matching a label selector are listed and then watched through the
//! runtime watcher, which reconnects on its own. The first pod reaching
//! `Running` or `Succeeded` ends the wait. A `Failed` pod does not: its
//! status message is remembered and the watch continues, since a replacement
//! pod may still come up. Watch errors are logged and skipped; the watcher
//! backs off and relists, and the caller's deadline bounds the wait.

use std::collections::BTreeMap;

use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::Api;
use kube::runtime::{WatchStreamExt, watcher};

use crate::error::{KubeError, Result};
use crate::pods::{label_selector, pod_phase};

/// Readiness of a single pod event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodReadiness {
    /// Running or Succeeded
    Ready,
    /// Failed, with the pod's status message
    Failed(String),
    /// Anything else
    Pending,
}

/// Classify a pod by its phase
pub fn classify(pod: &Pod) -> PodReadiness {
    match pod_phase(pod) {
        "Running" | "Succeeded" => PodReadiness::Ready,
        "Failed" => {
            let status = pod.status.as_ref();
            let message = status
                .and_then(|s| s.message.clone())
                .or_else(|| status.and_then(|s| s.reason.clone()))
                .unwrap_or_default();
            PodReadiness::Failed(message)
        }
        _ => PodReadiness::Pending,
    }
}

/// Wait until a pod matching `labels` in `namespace` is ready
///
/// Returns the status message of the last failed pod seen on the way, if any.
/// Does not time out by itself; callers bound it with a deadline.
pub async fn wait_for_ready(
    client: &Client,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<Option<String>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let selector = label_selector(labels);
    tracing::debug!(namespace, selector = %selector, "watching pods for readiness");

    let config = watcher::Config::default().labels(&selector);
    let stream = watcher(api, config).default_backoff().applied_objects();
    wait_on_stream(stream).await
}

/// Consume pod events until one is ready
///
/// Only the end of the stream stops the wait without a ready pod.
pub async fn wait_on_stream<S, E>(stream: S) -> Result<Option<String>>
where
    S: Stream<Item = std::result::Result<Pod, E>>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut last_failure = None;

    while let Some(event) = stream.next().await {
        let pod = match event {
            Ok(pod) => pod,
            Err(e) => {
                tracing::warn!(error = %e, "pod watch error, retrying");
                continue;
            }
        };
        let name = pod.metadata.name.as_deref().unwrap_or("<unnamed>");
        match classify(&pod) {
            PodReadiness::Ready => {
                tracing::debug!(pod = name, "pod ready");
                return Ok(last_failure);
            }
            PodReadiness::Failed(message) => {
                tracing::warn!(pod = name, message = %message, "pod failed, still waiting");
                last_failure = Some(message);
            }
            PodReadiness::Pending => {
                tracing::debug!(pod = name, phase = pod_phase(&pod), "pod not ready yet");
            }
        }
    }

    Err(KubeError::WatchClosed)
}
