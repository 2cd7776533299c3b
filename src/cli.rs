//! CLI arguments and subcommands for herakles-traffic-agent.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use herakles_traffic_agent::config::DEFAULT_CONFIG_PATH;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-traffic-agent",
    about = "SNMP interface traffic agent streaming rate metrics to Mackerel",
    long_about = "SNMP interface traffic agent streaming rate metrics to Mackerel.\n\n\
                  Polls network devices for IF-MIB traffic counters, converts them into \
                  per-interval rates with 32/64-bit wraparound handling and posts them \
                  through an ordered retry queue. Reloads its configuration on SIGHUP \
                  without losing rate baselines.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print effective config (secrets redacted) and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Log metrics instead of posting them and skip metadata updates
    #[arg(long)]
    pub dry_run: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and list the configured targets
    Check,

    /// Poll every target and print the converted metrics
    Test {
        /// Number of converted polls (one extra poll establishes the baseline)
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Seconds between polls
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
}
