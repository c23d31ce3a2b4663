//! Pods command - list pods by label

use std::collections::BTreeMap;

use console::style;
use stevedore_kube::{ClientConfig, label_selector, list_pods_by_labels, pod_phase};

use crate::display::styled_phase;
use crate::error::Result;
use crate::exit_codes;

/// Run the pods command
pub async fn run(client_config: &ClientConfig, labels: &BTreeMap<String, String>) -> Result<i32> {
    let client = stevedore_kube::connect(client_config).await?;
    let namespace = client_config.namespace();
    let pods = list_pods_by_labels(&client, namespace, labels).await?;

    if pods.is_empty() {
        println!(
            "No pods matching '{}' in namespace {}",
            label_selector(labels),
            namespace
        );
        return Ok(exit_codes::SUCCESS);
    }

    println!("{:<40} {}", style("NAME").bold(), style("PHASE").bold());
    for pod in &pods {
        println!(
            "{:<40} {}",
            pod.metadata.name.as_deref().unwrap_or("<unnamed>"),
            styled_phase(pod_phase(pod))
        );
    }
    Ok(exit_codes::SUCCESS)
}
