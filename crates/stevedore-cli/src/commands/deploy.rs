//! Deploy command - deploy a pod spec as a Deployment or StatefulSet

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use console::style;
use stevedore_kube::{ClientConfig, PodDeployOptions, PodSpec, build_container, deploy_pod};

use crate::error::{CliError, Result};
use crate::exit_codes;

/// Read and check a pod spec file
pub fn load_spec(path: &Path) -> Result<PodSpec> {
    let content = std::fs::read_to_string(path)?;
    let spec: PodSpec = serde_yaml::from_str(&content)?;

    if spec.name.is_empty() {
        return Err(CliError::input(format!(
            "{}: pod spec has an empty name",
            path.display()
        )));
    }
    if spec.image.is_empty() {
        return Err(CliError::input(format!(
            "{}: pod spec has an empty image",
            path.display()
        )));
    }

    // Quota errors surface before any cluster access
    build_container(&spec)?;
    Ok(spec)
}

/// Run the deploy command
#[allow(clippy::too_many_arguments)]
pub async fn run(
    file: &Path,
    client_config: &ClientConfig,
    labels: &BTreeMap<String, String>,
    replicas: i32,
    stateful: bool,
    duration: Duration,
    wait_ready: bool,
) -> Result<i32> {
    let spec = load_spec(file)?;
    let mut options = PodDeployOptions::new(spec)
        .with_replicas(replicas)
        .with_stateful(stateful)
        .with_namespace(client_config.namespace())
        .with_duration(duration)
        .with_wait_ready(wait_ready);
    for (key, value) in labels {
        options = options.with_label(key, value);
    }

    let client = stevedore_kube::connect(client_config).await?;

    let workload = if options.stateful { "StatefulSet" } else { "Deployment" };
    println!(
        "{} Deploying {} {} to namespace {}",
        style("→").cyan(),
        workload,
        style(&options.spec.name).bold(),
        style(&options.namespace).yellow()
    );

    let wait_ready = options.wait_ready;
    let report = deploy_pod(&client, options).await?;

    if let Some(message) = &report.failure_message {
        println!(
            "{} a pod failed before one became ready: {}",
            style("!").yellow().bold(),
            message
        );
    }
    let state = if wait_ready { "ready" } else { "applied" };
    println!(
        "{} {} {}/{} {}",
        style("✓").green().bold(),
        report.kind,
        report.namespace,
        style(&report.name).bold(),
        state
    );
    Ok(exit_codes::SUCCESS)
}
