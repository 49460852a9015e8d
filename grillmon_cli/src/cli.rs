//! CLI argument definitions and shared statics.

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "grillmon", version, about = "Pellet grill probe monitor and ETA forecaster")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON lines instead of tables and pretty logs
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded cook and show what the ETA would have been at each sample
    Forecast {
        /// JSON-lines status log
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Actual finish time (RFC3339, e.g. 2025-07-05T20:49:45-04:00)
        #[arg(long, value_name = "TIME", value_parser = parse_rfc3339)]
        actual: Option<DateTime<Utc>>,
        /// Also write the rows as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Follow a telemetry stream, annotate statuses with probe ETA
    Monitor {
        /// Telemetry source: JSON lines or broker envelopes, one per line ("-" = stdin)
        #[arg(short, long, value_name = "FILE", default_value = "-")]
        input: String,
        /// Append annotated statuses to this JSON-lines file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Seed the estimator from a previous status log
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },
    /// Load and validate the configuration
    SelfCheck,
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid actual time format (use RFC3339): {e}"))
}
