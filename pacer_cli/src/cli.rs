//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pacer", version, about = "Milestone pace estimator")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON lines (output and logs) instead of tables
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
    /// Run a recorded trace CSV through the estimator
    Replay {
        /// Trace file with headers elapsed_ms,distance_m[,gps_accuracy[,heart_rate]]
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
        /// Clear persisted finish times before replaying
        #[arg(long, action = ArgAction::SetTrue)]
        fresh: bool,
        /// Print every Nth tick (the last tick is always printed)
        #[arg(long, value_name = "N", default_value_t = 1)]
        every: usize,
        /// Print engine counters after the run
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Read samples from stdin, one CSV line per tick; `pause` and `reset` are commands
    Live,
    /// Show and verify the persisted finish-time record
    Inspect,
    /// Delete the persisted record and start a new activity
    Reset,
}
