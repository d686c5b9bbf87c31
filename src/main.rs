use aks_gateway::azure::auth::{StaticTokenProvider, ACCESS_TOKEN_ENV};
use aks_gateway::azure::{
    ArmHttpClient, AzureCache, AzureClient, AzureCredentials, NoopCache, ResourceIdentifier,
    ResponseCache, SubscriptionClientPool,
};
use aks_gateway::config::Config;
use aks_gateway::{handlers, VERSION};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// AKS cluster introspection through Azure Resource Manager
#[derive(Parser, Debug)]
#[command(name = "aks-gateway", version, about, long_about = None)]
struct Args {
    /// Full AKS resource ID of the target cluster
    #[arg(long, global = true, env = "AKS_RESOURCE_ID")]
    aks_resource_id: Option<String>,

    /// Subscription of the target cluster
    #[arg(short, long, global = true, env = "AZURE_SUBSCRIPTION_ID")]
    subscription: Option<String>,

    /// Resource group of the target cluster
    #[arg(short = 'g', long, global = true)]
    resource_group: Option<String>,

    /// Name of the target cluster
    #[arg(short = 'n', long, global = true)]
    cluster: Option<String>,

    /// ARM endpoint override
    #[arg(long, global = true, env = "AZURE_ARM_ENDPOINT")]
    endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the cluster resource
    Cluster,
    /// List clusters in the subscription (optionally one resource group)
    ListClusters,
    /// Show the cluster's virtual network
    Vnet,
    /// Show the cluster's node subnet
    Subnet,
    /// Show the network security group on the cluster's subnet
    Nsg,
    /// Show the route table on the cluster's subnet
    RouteTable,
    /// Show the standard AKS load balancers
    LoadBalancers,
    /// Resolve every network dependency of the cluster
    Topology,
    /// Show any supported resource by ID
    Resource {
        /// Full resource ID
        id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("aks-gateway {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("aks-gateway").join("aks-gateway.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".aks-gateway").join("aks-gateway.log");
    }
    PathBuf::from("aks-gateway.log")
}

/// Target cluster: full ID > subscription/group/name > last used
fn target_cluster(args: &Args, config: &Config) -> Result<ResourceIdentifier> {
    if let Some(id) = &args.aks_resource_id {
        return ResourceIdentifier::parse_cluster(id).context("Invalid --aks-resource-id");
    }

    match (&args.subscription, &args.resource_group, &args.cluster) {
        (Some(sub), Some(rg), Some(name)) => ResourceIdentifier::managed_cluster(sub, rg, name)
            .context("Invalid --subscription/--resource-group/--cluster"),
        (None, None, None) | (Some(_), None, None) => {
            let last = config.last_cluster.as_deref().context(
                "No cluster selected. Use --aks-resource-id or --subscription/--resource-group/--cluster",
            )?;
            ResourceIdentifier::parse_cluster(last).context("Invalid last_cluster in config")
        }
        _ => anyhow::bail!(
            "missing required parameters: subscription, resource group, and cluster name"
        ),
    }
}

fn build_client(args: &Args, config: &Config) -> Result<AzureClient> {
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.effective_endpoint());

    let provider = StaticTokenProvider::from_env()
        .with_context(|| format!("No Azure access token. Set {}", ACCESS_TOKEN_ENV))?;
    let credentials = AzureCredentials::new(Arc::new(provider));

    let http = ArmHttpClient::new(&endpoint, config.request_timeout())?;
    let pool = Arc::new(SubscriptionClientPool::new(credentials, http));

    let ttl = config.cache_ttl();
    let cache: Arc<dyn ResponseCache> = if ttl.is_zero() {
        Arc::new(NoopCache)
    } else {
        Arc::new(AzureCache::new(ttl).with_max_entries(config.cache_max_entries()))
    };

    tracing::info!("Using ARM endpoint {} (cache ttl {:?})", endpoint, ttl);
    Ok(AzureClient::new(pool, cache).with_hop_timeout(config.request_timeout()))
}

async fn run(args: &Args, mut config: Config) -> Result<String> {
    let client = build_client(args, &config)?;

    match &args.command {
        Command::ListClusters => {
            let sub = args
                .subscription
                .as_deref()
                .context("missing required parameter: subscription")?;
            return handlers::list_clusters(&client, sub, args.resource_group.as_deref()).await;
        }
        Command::Resource { id } => return handlers::resource_info(&client, id).await,
        _ => {}
    }

    let cluster = target_cluster(args, &config)?;
    tracing::info!("Using cluster: {}", cluster);
    if !cluster.is_uuid_shaped() {
        tracing::warn!(
            "Subscription {} does not look like a UUID",
            cluster.subscription_id
        );
    }

    let output = run_for_cluster(&client, &args.command, &cluster).await?;

    if let Err(e) = config.set_last_cluster(&cluster.full_id) {
        tracing::warn!("Failed to save config: {}", e);
    }

    Ok(output)
}

async fn run_for_cluster(
    client: &AzureClient,
    command: &Command,
    cluster: &ResourceIdentifier,
) -> Result<String> {
    match command {
        Command::Cluster => handlers::cluster_info(client, cluster).await,
        Command::Vnet => handlers::vnet_info(client, cluster).await,
        Command::Subnet => handlers::subnet_info(client, cluster).await,
        Command::Nsg => handlers::nsg_info(client, cluster).await,
        Command::RouteTable => handlers::route_table_info(client, cluster).await,
        Command::LoadBalancers => handlers::load_balancers_info(client, cluster).await,
        Command::Topology => handlers::network_topology(client, cluster).await,
        Command::ListClusters | Command::Resource { .. } => {
            anyhow::bail!("{:?} does not target a single cluster", command)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = Config::load();
    let output = run(&args, config).await?;
    println!("{}", output);

    Ok(())
}
