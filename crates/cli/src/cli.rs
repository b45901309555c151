//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::EmissionPolicy;
use std::path::PathBuf;

/// AHRS Relay - sensor fusion relay for phones and IMU boards
#[derive(Parser, Debug)]
#[command(
    name = "ahrs-relay",
    author,
    version,
    about = "AHRS sensor fusion relay",
    long_about = "Receives gyroscope, accelerometer and magnetometer streams over websocket,\n\
                  TCP, serial or file replay, merges them into complete frames, estimates\n\
                  orientation and distributes the results to configured subscribers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "AHRS_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "AHRS_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay pipeline
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
    #[arg(short, long, default_value = "relay.toml", env = "AHRS_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Stop after this many orientation results (0 = unlimited)
    #[arg(long, default_value = "0", env = "AHRS_RELAY_MAX_RESULTS")]
    pub max_results: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "AHRS_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "256", env = "AHRS_RELAY_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "AHRS_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Override the synchronizer emission policy from configuration
    #[arg(long, value_enum, env = "AHRS_RELAY_POLICY")]
    pub policy: Option<PolicyArg>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml", env = "AHRS_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "AHRS_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed source information
    #[arg(long)]
    pub sources: bool,

    /// Show subscriber configuration
    #[arg(long)]
    pub subscribers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Emission policy as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// Emit once per completion, then clear all axes
    Flush,
    /// Emit on every update once complete
    Retain,
}

impl From<PolicyArg> for EmissionPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Flush => EmissionPolicy::Flush,
            PolicyArg::Retain => EmissionPolicy::Retain,
        }
    }
}
