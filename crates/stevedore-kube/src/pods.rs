//! Pod listing by label

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::Client;
use kube::api::{Api, ListParams};

use crate::error::Result;

/// Render a label map as an equality-based selector (`a=1,b=2`)
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// List pods in `namespace` carrying all of `labels`
pub async fn list_pods_by_labels(
    client: &Client,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<Vec<Pod>> {
    list_pods_by_selector(client, namespace, &label_selector(labels)).await
}

/// List pods in `namespace` matching a label selector expression
pub async fn list_pods_by_selector(
    client: &Client,
    namespace: &str,
    selector: &str,
) -> Result<Vec<Pod>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().labels(selector);
    let pods = api.list(&params).await?;
    Ok(pods.items)
}

/// Phase reported by a pod, or `Unknown`
pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}
