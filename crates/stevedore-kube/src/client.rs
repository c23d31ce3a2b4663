//! Kubernetes client construction
//!
//! Clients are built from an explicit [`ClientConfig`] rather than from
//! process-wide state: either a kubeconfig path supplied by the caller or the
//! conventional `~/.kube/config`.

use std::path::PathBuf;

use k8s_openapi::NamespaceResourceScope;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Resource};

use crate::error::{KubeError, Result};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Where to find the cluster and which namespace to work in
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Path to a kubeconfig file (defaults to `~/.kube/config`)
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use (defaults to the current context)
    pub context: Option<String>,

    /// Target namespace (defaults to `default`)
    pub namespace: Option<String>,
}

impl ClientConfig {
    /// Create a config that uses the default kubeconfig location
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit kubeconfig file
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use a specific kubeconfig context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Work in a specific namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Resolve the kubeconfig path, made absolute
    pub fn kubeconfig_path(&self) -> Result<PathBuf> {
        match &self.kubeconfig {
            Some(path) if path.is_absolute() => Ok(path.clone()),
            Some(path) => Ok(std::env::current_dir()?.join(path)),
            None => dirs::home_dir()
                .map(|home| home.join(".kube").join("config"))
                .ok_or_else(|| {
                    KubeError::InvalidConfig(
                        "cannot determine home directory for the default kubeconfig".to_string(),
                    )
                }),
        }
    }

    /// The configured namespace, or `default`
    pub fn namespace(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// Build a Kubernetes client from the given configuration
pub async fn connect(config: &ClientConfig) -> Result<Client> {
    let path = config.kubeconfig_path()?;
    tracing::debug!(path = %path.display(), "loading kubeconfig");

    let kubeconfig = Kubeconfig::read_from(&path)?;
    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };
    let client_config = kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?;

    Ok(Client::try_from(client_config)?)
}

/// A Kubernetes client bound to one namespace
#[derive(Clone)]
pub struct NamespacedClient {
    client: Client,
    namespace: String,
}

impl NamespacedClient {
    /// Wrap an existing client
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace
        };
        Self { client, namespace }
    }

    /// Connect using the given configuration
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let client = connect(config).await?;
        Ok(Self::new(client, config.namespace()))
    }

    /// Get the underlying Kubernetes client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the bound namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespaced API handle for any resource kind
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: http://127.0.0.1:6443
contexts:
- name: test
  context:
    cluster: test
    user: test
    namespace: apps
current-context: test
users:
- name: test
  user:
    token: abc
"#;

    fn write_kubeconfig() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_kubeconfig_path() {
        let config = ClientConfig::new();
        let path = config.kubeconfig_path().unwrap();
        assert!(path.ends_with(".kube/config"));
    }

    #[test]
    fn test_relative_kubeconfig_made_absolute() {
        let config = ClientConfig::new().with_kubeconfig("conf/kubeconfig");
        let path = config.kubeconfig_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("conf/kubeconfig"));
    }

    #[test]
    fn test_namespace_defaults() {
        assert_eq!(ClientConfig::new().namespace(), "default");
        assert_eq!(ClientConfig::new().with_namespace("").namespace(), "default");
        assert_eq!(ClientConfig::new().with_namespace("apps").namespace(), "apps");
    }

    #[tokio::test]
    async fn test_connect_with_explicit_kubeconfig() {
        let file = write_kubeconfig();
        let config = ClientConfig::new().with_kubeconfig(file.path());

        let client = connect(&config).await.unwrap();
        assert_eq!(client.default_namespace(), "apps");
    }

    #[tokio::test]
    async fn test_connect_unknown_context_fails() {
        let file = write_kubeconfig();
        let config = ClientConfig::new()
            .with_kubeconfig(file.path())
            .with_context("missing");

        let Err(err) = connect(&config).await else {
            panic!("connecting with an unknown context should fail");
        };
        assert!(matches!(err, KubeError::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn test_connect_missing_file_fails() {
        let config = ClientConfig::new().with_kubeconfig("/nonexistent/stevedore/kubeconfig");
        assert!(connect(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_namespaced_client_empty_namespace() {
        let file = write_kubeconfig();
        let config = ClientConfig::new().with_kubeconfig(file.path());
        let client = connect(&config).await.unwrap();

        let namespaced = NamespacedClient::new(client, "");
        assert_eq!(namespaced.namespace(), "default");
    }
}
