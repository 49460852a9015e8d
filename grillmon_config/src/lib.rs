#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the grill monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every table is optional; missing tables and keys fall back to the
//!   estimator's documented defaults.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimatorCfg {
    /// Observations kept for fitting (FIFO beyond this)
    pub history_len: usize,
    /// Samples required before the time constant is refit
    pub min_fit_samples: usize,
    /// Most recent samples used by the refit
    pub fit_window: usize,
    /// Time constant before any fit exists (s)
    pub initial_tau_s: f64,
    /// Grid search bounds and step for the time constant (s)
    pub tau_min_s: f64,
    pub tau_max_s: f64,
    pub tau_step_s: f64,
    /// Accept a new tau only when its error is below `accept_ratio` x current error
    pub accept_ratio: f64,
    /// Cap on the exponential remaining-time estimate (s)
    pub max_eta_s: u64,
    /// Samples considered by the uncertainty estimate
    pub uncertainty_window: usize,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            history_len: 20,
            min_fit_samples: 3,
            fit_window: 10,
            initial_tau_s: 3600.0,
            tau_min_s: 300.0,
            tau_max_s: 28_800.0,
            tau_step_s: 300.0,
            accept_ratio: 0.9,
            max_eta_s: 8 * 3600,
            uncertainty_window: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FallbackCfg {
    /// Most recent samples considered by the rate heuristic
    pub window: usize,
    /// Cap on the heuristic estimate; also the ceiling for trusting the exponential model (s)
    pub max_eta_s: u64,
}

impl Default for FallbackCfg {
    fn default() -> Self {
        Self {
            window: 5,
            max_eta_s: 24 * 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorCfg {
    /// Warn when no telemetry arrives for this long
    pub stall_timeout_ms: u64,
    /// Bounded queue between the sampler thread and the estimator
    pub channel_capacity: usize,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            stall_timeout_ms: 60_000,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub estimator: EstimatorCfg,
    pub fallback: FallbackCfg,
    pub monitor: MonitorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let e = &self.estimator;
        // Estimator
        if e.history_len == 0 {
            eyre::bail!("estimator.history_len must be >= 1");
        }
        if e.min_fit_samples < 2 {
            eyre::bail!("estimator.min_fit_samples must be >= 2");
        }
        if e.fit_window == 0 {
            eyre::bail!("estimator.fit_window must be >= 1");
        }
        if e.fit_window > e.history_len {
            eyre::bail!("estimator.fit_window must not exceed estimator.history_len");
        }
        if !(e.initial_tau_s.is_finite() && e.initial_tau_s > 0.0) {
            eyre::bail!("estimator.initial_tau_s must be > 0");
        }
        if !(e.tau_min_s.is_finite() && e.tau_min_s > 0.0) {
            eyre::bail!("estimator.tau_min_s must be > 0");
        }
        if !(e.tau_max_s.is_finite() && e.tau_max_s >= e.tau_min_s) {
            eyre::bail!("estimator.tau_max_s must be >= estimator.tau_min_s");
        }
        if !(e.tau_step_s.is_finite() && e.tau_step_s > 0.0) {
            eyre::bail!("estimator.tau_step_s must be > 0");
        }
        if (e.tau_max_s - e.tau_min_s) / e.tau_step_s > 100_000.0 {
            eyre::bail!("estimator tau grid is unreasonably large (>100000 candidates)");
        }
        if !(e.accept_ratio > 0.0 && e.accept_ratio <= 1.0) {
            eyre::bail!("estimator.accept_ratio must be in (0.0, 1.0]");
        }
        if e.max_eta_s == 0 {
            eyre::bail!("estimator.max_eta_s must be >= 1");
        }
        if e.uncertainty_window == 0 {
            eyre::bail!("estimator.uncertainty_window must be >= 1");
        }

        // Fallback
        if self.fallback.window < 2 {
            eyre::bail!("fallback.window must be >= 2");
        }
        if self.fallback.max_eta_s == 0 {
            eyre::bail!("fallback.max_eta_s must be >= 1");
        }

        // Monitor
        if self.monitor.stall_timeout_ms == 0 {
            eyre::bail!("monitor.stall_timeout_ms must be >= 1");
        }
        if self.monitor.channel_capacity == 0 {
            eyre::bail!("monitor.channel_capacity must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}
