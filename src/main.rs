//! herakles-traffic-agent - version 0.1.0
//!
//! SNMP traffic agent with tracing logging.
//! This is the main entry point that starts the supervisor and handles subcommands.

mod cli;
mod commands;

use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, Commands, ConfigFormat, LogLevel};
use commands::{command_check, command_test};
use herakles_traffic_agent::collectors::{InterfaceInfo, SnmpCollectorFactory};
use herakles_traffic_agent::config::{
    load_config, load_raw_config, Config, FileConfigSource, GraphDef, RawConfig,
};
use herakles_traffic_agent::mackerel::{ClientError, MackerelClient};
use herakles_traffic_agent::metric::Metric;
use herakles_traffic_agent::sdnotify::SystemdNotifier;
use herakles_traffic_agent::sendqueue::Sender;
use herakles_traffic_agent::signals;
use herakles_traffic_agent::supervisor::{Dependencies, Supervisor, EXIT_CONFIG};
use herakles_traffic_agent::ticker::MetadataUpdater;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    debug!("Logging initialized with level: {:?}", args.log_level);
}

/// Prints the configuration file with secrets redacted.
fn show_config(raw: &RawConfig, format: &ConfigFormat) -> anyhow::Result<()> {
    let redacted = raw.redacted();
    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&redacted)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&redacted)?,
        ConfigFormat::Toml => toml::to_string_pretty(&redacted)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Loads the configuration, exiting with code 1 when it is unusable.
fn load_validated_config(args: &Args) -> Config {
    match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

/// Logs metrics instead of posting them (`--dry-run`).
struct LogSender;

#[async_trait]
impl Sender for LogSender {
    async fn send(&self, host_id: &str, metrics: &[Metric]) -> Result<(), ClientError> {
        for metric in metrics {
            info!(
                "[dry-run] {} {} {} {}",
                host_id, metric.name, metric.time, metric.value
            );
        }
        Ok(())
    }
}

/// Skips every metadata operation (`--dry-run`).
struct LogUpdater;

#[async_trait]
impl MetadataUpdater for LogUpdater {
    async fn update_host(
        &self,
        host_id: &str,
        _host_addr: &str,
        hostname: &str,
        inventory: &[InterfaceInfo],
    ) -> Result<(), ClientError> {
        info!(
            "[dry-run] update host {} ({}) with {} interfaces",
            host_id,
            hostname,
            inventory.len()
        );
        Ok(())
    }

    async fn create_graph_defs(&self, defs: &[GraphDef]) -> Result<(), ClientError> {
        info!("[dry-run] create {} graph definitions", defs.len());
        Ok(())
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args);

    if args.show_config {
        let raw = match load_raw_config(&args.config) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(EXIT_CONFIG);
            }
        };
        return show_config(&raw, &args.config_format);
    }

    let config = load_validated_config(&args);

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Check => command_check(&config),
            Commands::Test {
                iterations,
                interval,
            } => command_test(*iterations, *interval, &config).await,
        };
    }

    info!("Starting herakles-traffic-agent");
    if args.dry_run {
        info!("Dry run: metrics are logged, metadata updates are skipped");
    }

    // Handlers are installed before startup so signals also reach the launch stagger
    let events = signals::listen()?;

    let (sender, updater): (Arc<dyn Sender>, Arc<dyn MetadataUpdater>) = if args.dry_run {
        (Arc::new(LogSender), Arc::new(LogUpdater))
    } else {
        let client = Arc::new(MackerelClient::new(
            config.api_key.clone(),
            &config.api_base,
        )?);
        (client.clone(), client)
    };

    let deps = Dependencies {
        factory: Arc::new(SnmpCollectorFactory::new(config.agent.snmp_timeout())),
        sender,
        updater,
        notifier: Arc::new(SystemdNotifier::from_env()),
        source: Arc::new(FileConfigSource::new(args.config.clone())),
    };

    let supervisor = Supervisor::new(config.agent.clone(), deps);
    let code = supervisor.serve(&config.targets, events).await;
    if code != 0 {
        error!("Exiting with code {}", code);
    }
    info!("herakles-traffic-agent stopped");
    std::process::exit(code);
}
