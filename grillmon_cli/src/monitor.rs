//! `grillmon monitor`: follow a telemetry stream and annotate each status with its ETA.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grillmon_config::Config;
use grillmon_core::config::{EstimatorCfg, FallbackCfg, MonitorCfg};
use grillmon_core::error::GrillError;
use grillmon_core::{
    EtaEstimator, JsonLinesObserver, Monitor, NullObserver, Sampler, StatusObserver, replay,
};
use grillmon_traits::{SystemClock, TelemetrySource};

use crate::source::JsonLinesSource;

/// Hint passed to each source read.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

pub fn run_monitor(
    cfg: &Config,
    input: &str,
    output: Option<&Path>,
    history: Option<&Path>,
) -> eyre::Result<()> {
    let mon_cfg = MonitorCfg::from(&cfg.monitor);
    let estimator = EtaEstimator::builder()
        .with_config(EstimatorCfg::from(&cfg.estimator))
        .with_fallback(FallbackCfg::from(&cfg.fallback))
        .try_build()?;

    let observer: Box<dyn StatusObserver> = match output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| GrillError::Io(format!("open {}: {e}", path.display())))?;
            Box::new(JsonLinesObserver::new(BufWriter::new(file)))
        }
        None => Box::new(NullObserver),
    };

    let mut monitor = Monitor::new(estimator, observer, mon_cfg.clone());
    if let Some(path) = history {
        let file = File::open(path)
            .map_err(|e| GrillError::Io(format!("open {}: {e}", path.display())))?;
        let entries = replay::load_history(BufReader::new(file))?;
        if monitor.seed(&entries) == 0 {
            tracing::warn!(path = %path.display(), "history has no probe data");
        }
    }

    let source: Box<dyn TelemetrySource + Send> = if input == "-" {
        Box::new(JsonLinesSource::new(BufReader::new(io::stdin())))
    } else {
        let file =
            File::open(input).map_err(|e| GrillError::Io(format!("open {input}: {e}")))?;
        Box::new(JsonLinesSource::new(BufReader::new(file)))
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    tracing::info!(input, "monitoring telemetry");
    let sampler = Sampler::spawn(source, mon_cfg.channel_capacity, READ_TIMEOUT, SystemClock::new());
    let report = monitor.run(&sampler, &stop)?;
    tracing::debug!(?report, "monitor report");
    Ok(())
}
