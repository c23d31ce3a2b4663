//! Stevedore CLI - run containers, build and push images, deploy pods to Kubernetes

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use stevedore_docker::{BuildOptions, EngineConfig, PushOptions, ResourceLimits, RunOptions};
use stevedore_kube::{ClientConfig, DEFAULT_DURATION, Port, ServiceOptions, ServiceType};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use error::Result;
use util::{parse_key_value, parse_memory, parse_mount, parse_port, parse_service_type};

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author = "Stevedore Contributors")]
#[command(version)]
#[command(about = "Run containers locally and deploy pods to Kubernetes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

/// Container engine connection flags
#[derive(Args)]
struct EngineArgs {
    /// Engine address (unix://, tcp:// or http://)
    #[arg(long, env = "DOCKER_HOST")]
    host: Option<String>,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        match &self.host {
            Some(host) => EngineConfig::new().with_host(host),
            None => EngineConfig::new(),
        }
    }
}

/// Cluster connection flags
#[derive(Args)]
struct ClusterArgs {
    /// Target namespace
    #[arg(short, long, default_value = "default")]
    namespace: String,

    /// Path to kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,
}

impl ClusterArgs {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new().with_namespace(&self.namespace);
        if let Some(path) = &self.kubeconfig {
            config = config.with_kubeconfig(path);
        }
        if let Some(context) = &self.context {
            config = config.with_context(context);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-shot container and print its output
    Run {
        /// Image to run
        image: String,

        /// Command and arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        cmd: Vec<String>,

        /// Environment variable (KEY=VALUE)
        #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,

        /// Bind mount (HOST:CONTAINER)
        #[arg(short = 'v', long = "volume", value_parser = parse_mount)]
        volumes: Vec<(String, String)>,

        /// Working directory inside the container
        #[arg(short = 'w', long)]
        workdir: Option<String>,

        /// Memory limit (e.g. 512m, 1g)
        #[arg(long, value_parser = parse_memory)]
        memory: Option<i64>,

        /// CPU limit in cores
        #[arg(long)]
        cpus: Option<f64>,

        /// Seconds to wait for the container to stop
        #[arg(long)]
        timeout: Option<u64>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Build an image from a context directory
    Build {
        /// Build context directory
        context: PathBuf,

        /// Dockerfile path relative to the context
        #[arg(short = 'f', long, default_value = "Dockerfile")]
        file: String,

        /// Image tag (repeatable)
        #[arg(short = 't', long = "tag", required = true)]
        tags: Vec<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Push an image to its registry
    Push {
        /// Image reference (repo[:tag])
        reference: String,

        /// Registry username
        #[arg(long)]
        username: Option<String>,

        /// Registry password
        #[arg(long, env = "STEVEDORE_REGISTRY_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Deploy a pod spec as a Deployment or StatefulSet
    Deploy {
        /// Pod spec file (YAML)
        file: PathBuf,

        /// Deploy as a StatefulSet
        #[arg(long)]
        stateful: bool,

        /// Number of replicas
        #[arg(long, default_value_t = 1)]
        replicas: i32,

        /// Seconds before the deploy is abandoned
        #[arg(long, default_value_t = DEFAULT_DURATION.as_secs())]
        timeout: u64,

        /// Wait until a pod is running
        #[arg(long)]
        wait: bool,

        /// Selector label (KEY=VALUE)
        #[arg(short = 'l', long = "label", value_parser = parse_key_value)]
        labels: Vec<(String, String)>,

        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Create or replace a service
    Service {
        /// Service name
        name: String,

        /// Port ([NAME:]PORT[/PROTOCOL])
        #[arg(short = 'p', long = "port", value_parser = parse_port, required = true)]
        ports: Vec<Port>,

        /// Pod selector label (KEY=VALUE)
        #[arg(short = 'l', long = "label", value_parser = parse_key_value, required = true)]
        labels: Vec<(String, String)>,

        /// Service type
        #[arg(long = "type", value_parser = parse_service_type, default_value = "ClusterIP")]
        service_type: ServiceType,

        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// List pods matching labels
    Pods {
        /// Selector label (KEY=VALUE)
        #[arg(short = 'l', long = "label", value_parser = parse_key_value, required = true)]
        labels: Vec<(String, String)>,

        #[command(flatten)]
        cluster: ClusterArgs,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn execute(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            image,
            cmd,
            env,
            volumes,
            workdir,
            memory,
            cpus,
            timeout,
            engine,
        } => {
            let mut options = RunOptions::new(image).with_cmd(cmd);
            for (key, value) in env {
                options = options.with_env(key, value);
            }
            for (host, container) in volumes {
                options = options.with_mount(host, container);
            }
            if let Some(dir) = workdir {
                options = options.with_work_dir(dir);
            }
            if memory.is_some() || cpus.is_some() {
                let mut limits = ResourceLimits::default();
                if let Some(bytes) = memory {
                    limits = limits.with_memory(bytes);
                }
                if let Some(cpus) = cpus {
                    limits = limits.with_cpus(cpus);
                }
                options = options.with_limits(limits);
            }
            if let Some(secs) = timeout {
                options = options.with_timeout(Duration::from_secs(secs));
            }
            commands::run::run(&engine.config(), &options).await
        }

        Commands::Build {
            context,
            file,
            tags,
            engine,
        } => {
            let options = tags
                .into_iter()
                .fold(BuildOptions::new(context).with_dockerfile(file), |o, t| {
                    o.with_tag(t)
                });
            commands::build::run(&engine.config(), &options).await
        }

        Commands::Push {
            reference,
            username,
            password,
            engine,
        } => {
            let mut options = PushOptions::new(reference);
            options.username = username;
            options.password = password;
            commands::push::run(&engine.config(), &options).await
        }

        Commands::Deploy {
            file,
            stateful,
            replicas,
            timeout,
            wait,
            labels,
            cluster,
        } => {
            let labels: BTreeMap<_, _> = labels.into_iter().collect();
            commands::deploy::run(
                &file,
                &cluster.config(),
                &labels,
                replicas,
                stateful,
                Duration::from_secs(timeout),
                wait,
            )
            .await
        }

        Commands::Service {
            name,
            ports,
            labels,
            service_type,
            cluster,
        } => {
            let mut options = ServiceOptions::new(name).with_type(service_type);
            options.ports = ports;
            options.labels = labels.into_iter().collect();
            commands::service::run(&cluster.config(), &options).await
        }

        Commands::Pods { labels, cluster } => {
            let labels: BTreeMap<_, _> = labels.into_iter().collect();
            commands::pods::run(&cluster.config(), &labels).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let code = match execute(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
