//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "livestate", version, about = "Live controller state over a simulated machine")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON lines on stdout instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the demo program and print status changesets as they happen
    Watch {
        /// Stop after this many polls (default: until the program finishes)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Start with a full changeset of every field
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Run the demo program and print the compressed tool-tip trajectory
    Trace {
        /// Stop after this many reads (default: until the program finishes)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Override sampler.interval_ms
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Override sampler.max_history
        #[arg(long, value_name = "N")]
        max_history: Option<usize>,
    },
    /// Dispatch the demo program one move at a time, waiting for each to complete
    Run {
        /// Override completion.timeout_ms
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
    /// Look up a tool in the simulated tool table
    Tool {
        /// Tool number
        #[arg(long)]
        number: i32,
    },
    /// Quick health check (config valid, sim reachable)
    SelfCheck,
}
