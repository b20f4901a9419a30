//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "gamalog",
    version,
    about = "Tail, classify and rotate the machine log inside a USB gadget image"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/gamalog.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty; print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the log, classify the machine state and forward observations
    Tail {
        /// Override tailer.interval_ms
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Run a single cycle and print its outcome
        #[arg(long, action = ArgAction::SetTrue)]
        once: bool,
    },
    /// Archive all but the header and the newest lines into the backup file
    Rotate,
    /// Append synthetic records to the log (bench testing without the machine)
    Simulate {
        /// Number of records to append (unbounded when omitted)
        #[arg(long, value_name = "N")]
        count: Option<u64>,
        /// Override simulator.interval_ms
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Override simulator.step_secs
        #[arg(long, value_name = "SECS")]
        step_secs: Option<u64>,
    },
    /// Check the image toolset and read the log once
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
