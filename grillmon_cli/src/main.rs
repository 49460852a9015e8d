mod cli;
mod error_fmt;
mod forecast;
mod logging;
mod monitor;
mod source;

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use grillmon_config::Config;
use grillmon_core::error::GrillError;

fn main() {
    let _ = color_eyre::install();
    // clap prints usage errors itself and exits 2
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = match &cli.config {
        Some(path) => grillmon_config::load_file(path)
            .map_err(|e| GrillError::Config(format!("{e}")))?,
        None => Config::default(),
    };
    logging::init_tracing(&cli.log_level, cli.json, &cfg.logging)
        .map_err(|e| GrillError::Config(format!("{e:#}")))?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Forecast { input, actual, csv } => {
            forecast::run_forecast(&cfg, &input, actual, csv.as_deref(), cli.json)
        }
        Commands::Monitor {
            input,
            output,
            history,
        } => monitor::run_monitor(&cfg, &input, output.as_deref(), history.as_deref()),
        Commands::SelfCheck => {
            grillmon_core::EtaEstimator::builder()
                .with_config((&cfg.estimator).into())
                .with_fallback((&cfg.fallback).into())
                .try_build()?;
            println!("ok");
            Ok(())
        }
    }
}
