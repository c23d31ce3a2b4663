//! Service command - create or replace a service

use console::style;
use stevedore_kube::{ClientConfig, NamespacedClient, ServiceOptions};

use crate::error::Result;
use crate::exit_codes;

/// Run the service command
pub async fn run(client_config: &ClientConfig, options: &ServiceOptions) -> Result<i32> {
    let client = NamespacedClient::connect(client_config).await?;

    println!(
        "{} Replacing service {} in namespace {}",
        style("→").cyan(),
        style(&options.name).bold(),
        style(client.namespace()).yellow()
    );

    let service = client.create_or_replace_service(options).await?;
    let spec = service.spec.unwrap_or_default();

    println!(
        "{} Service {} ({})",
        style("✓").green().bold(),
        style(service.metadata.name.as_deref().unwrap_or(&options.name)).bold(),
        spec.type_.as_deref().unwrap_or(options.service_type.as_str())
    );
    if let Some(ip) = spec.cluster_ip.as_deref() {
        println!("  Cluster IP: {}", ip);
    }
    for port in spec.ports.unwrap_or_default() {
        println!(
            "  {:<12} {}/{}",
            port.name.unwrap_or_default(),
            port.port,
            port.protocol.unwrap_or_else(|| "TCP".to_string())
        );
    }
    Ok(exit_codes::SUCCESS)
}
