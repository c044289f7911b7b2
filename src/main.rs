use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solr_connector::config::{ConfigError, ConnectorConfig, LoggingConfig};
use solr_connector::{connector_from_config, Connector, EndpointKey, HealthCheckManager, RestMethod};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solr-connector")]
#[command(about = "Inspect and probe Apache Solr servers through a configured connector")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/solr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the latency of the core or server endpoint
    Ping {
        /// Probe the server instead of the core
        #[arg(long)]
        server: bool,
        /// Keep probing every N seconds
        #[arg(long)]
        watch: Option<u64>,
        /// Stop watching after this many probes
        #[arg(long, requires = "watch")]
        rounds: Option<usize>,
    },
    /// Print the system info payload of the core or server
    Info {
        #[arg(long)]
        server: bool,
        /// Bypass cached metadata
        #[arg(long)]
        reset: bool,
    },
    /// Print the negotiated Solr version
    DetectVersion {
        /// Ignore the configured version override
        #[arg(long)]
        force: bool,
    },
    /// Print the update handler and index summary of the core
    Stats,
    /// Send a REST request to the core or server
    Rest {
        /// Handler path, e.g. "schema/fields"
        path: String,
        #[arg(long)]
        server: bool,
        /// Send this JSON body with POST
        #[arg(long)]
        post: Option<String>,
    },
    /// Validate configuration file
    Validate,
    /// Generate example configuration files
    Config {
        /// Connector kind (standard or basic_auth)
        #[arg(short = 'k', long, default_value = "standard")]
        connector: String,
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ping { server, watch, rounds } => {
            let connector = load_connector(&cli.config)?;
            ping(connector, server, watch, rounds).await?;
        }
        Commands::Info { server, reset } => {
            let connector = load_connector(&cli.config)?;
            let payload = if server {
                connector.get_server_info(reset).await?
            } else {
                connector.get_core_info(reset).await?
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::DetectVersion { force } => {
            let connector = load_connector(&cli.config)?;
            let version = connector.get_solr_version(force).await;
            println!("Solr version: {}", version);
            println!("Branch: {}", connector.get_solr_branch(&version).await);
            println!("luceneMatchVersion: {}", connector.get_lucene_match_version(&version).await);
        }
        Commands::Stats => {
            let connector = load_connector(&cli.config)?;
            let summary = connector.get_stats_summary().await?;
            println!("Core: {}", summary.core_name);
            println!("Schema: {}", summary.schema_version);
            println!("Index size: {}", summary.index_size);
            println!("Pending documents: {}", summary.pending_docs);
            println!("Autocommit interval: {}", summary.autocommit_time);
            println!(
                "Deletes: {} ({} by id, {} by query)",
                summary.deletes_total, summary.deletes_by_id, summary.deletes_by_query
            );
        }
        Commands::Rest { path, server, post } => {
            let connector = load_connector(&cli.config)?;
            let key = if server { EndpointKey::Server } else { EndpointKey::Core };
            let method = if post.is_some() { RestMethod::Post } else { RestMethod::Get };
            let payload = connector
                .rest_request(key, &path, method, post.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Validate => {
            validate_config(&cli.config)?;
        }
        Commands::Config { connector, output } => {
            generate_config(&connector, &output)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

fn load_connector(config_path: &Path) -> Result<Box<dyn Connector>> {
    let config = ConnectorConfig::load_from_file(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_logging(&config.logging)?;
    info!("Configuration loaded from: {:?}", config_path);

    let connector = connector_from_config(&config)?;
    info!("Using {} connector for {}", connector.label(), connector.core_uri());
    Ok(connector)
}

async fn ping(connector: Box<dyn Connector>, server: bool, watch: Option<u64>, rounds: Option<usize>) -> Result<()> {
    let target = if server { EndpointKey::Server } else { EndpointKey::Core };

    let connector: Arc<dyn Connector> = Arc::from(connector);
    let manager = HealthCheckManager::new(connector, target, Duration::from_secs(watch.unwrap_or(1)));

    let status = if watch.is_some() {
        manager.run_health_checks(rounds).await
    } else {
        Some(manager.check_once().await)
    };

    match status {
        Some(status) if status.is_healthy() => {
            println!("{} (latency {:.6}s)", status, status.latency_secs());
            Ok(())
        }
        Some(status) => bail!("Solr {} is not reachable: {}", target, status),
        None => Ok(()),
    }
}

fn generate_config(connector: &str, output: &Path) -> Result<()> {
    println!("Generating {} configuration file: {:?}", connector, output);

    ConnectorConfig::create_example_config(output, connector).context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your environment and run:");
    println!("  solr-connector --config {:?} ping", output);

    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match ConnectorConfig::load_from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("  Connector: {}", config.connector.as_str());
            println!("  Server URI: {}", config.endpoint.server_base_uri());
            println!("  Core URI: {}", config.endpoint.core_base_uri());
            println!("  Metadata store: {:?}", config.cache.store);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
                ConfigError::ValidationError(errors) => {
                    for error in errors {
                        eprintln!("  {}", error);
                    }
                }
            }
            Err(e.into())
        }
    }
}

fn show_version() {
    println!("solr-connector v{}", env!("CARGO_PKG_VERSION"));
    println!("Session and request dispatch for Apache Solr");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
    println!();
    println!("Features:");
    println!("  • Standard and basic auth connectors");
    println!("  • Cached metadata with memory or file stores");
    println!("  • Solr version and schema negotiation");
    println!("  • Latency probes and core statistics");
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized at level: {}", config.level);
    Ok(())
}
