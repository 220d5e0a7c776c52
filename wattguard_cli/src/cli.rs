//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "wattguard", version, about = "Power monitor with a latching relay interlock")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/wattguard.toml")]
    pub config: PathBuf,

    /// Emit telemetry, responses and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample continuously, reading operator commands from stdin
    Run {
        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Override sampling.period_ms (>= 1)
        #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
        period_ms: Option<u64>,
        /// Print the buffered history once the run ends
        #[arg(long, action = ArgAction::SetTrue)]
        replay_history: bool,
    },
    /// Feed recorded voltage/current rows through the monitor
    Replay {
        /// Headered CSV, headerless device CSV, or JSON lines with voltage and current
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
    },
    /// Initialize sensor and relay and take one reading
    SelfCheck,
}
