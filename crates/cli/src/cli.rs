//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// Log Shipper - batch log lines and publish them to files or object storage
#[derive(Parser, Debug)]
#[command(
    name = "log-shipper",
    author,
    version,
    about = "Batching log shipper",
    long_about = "Reads log lines from stdin or a file, accumulates them into bounded \n\
                  batches and publishes every batch to the configured sinks \n\
                  (object storage, filesystem, log summary)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOG_SHIPPER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        default_value = "compact",
        global = true,
        env = "LOG_SHIPPER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ship log lines until end of input or a shutdown signal
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "log-shipper.toml",
        env = "LOG_SHIPPER_CONFIG"
    )]
    pub config: PathBuf,

    /// Read lines from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override the cache name
    #[arg(long, env = "LOG_SHIPPER_NAME")]
    pub name: Option<String>,

    /// Override records per batch
    #[arg(long, env = "LOG_SHIPPER_CAPACITY")]
    pub capacity: Option<usize>,

    /// Override the keep-open flush interval in seconds (0 disables)
    #[arg(long, env = "LOG_SHIPPER_FLUSH_INTERVAL")]
    pub flush_interval: Option<u64>,

    /// Override tags (`,` or `;` separated)
    #[arg(long, env = "LOG_SHIPPER_TAGS")]
    pub tags: Option<String>,

    /// Override the host label
    #[arg(long, env = "LOG_SHIPPER_HOST")]
    pub host: Option<String>,

    /// Disable gzip compression
    #[arg(long)]
    pub no_compress: bool,

    /// Validate configuration and exit without shipping
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOG_SHIPPER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "log-shipper.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "log-shipper.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters (credentials are redacted)
    #[arg(long)]
    pub sinks: bool,
}
