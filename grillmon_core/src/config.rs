//! Runtime configuration for the estimator and the monitor loop.
//!
//! These are the structs the core operates on. They are separate from the
//! TOML-deserialized config in `grillmon_config`; see `conversions`.

use std::time::Duration;

use crate::error::BuildError;

/// Exponential approach model parameters.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    /// Maximum observations retained (FIFO eviction beyond this).
    pub history_len: usize,
    /// Samples required before the time constant is refit.
    pub min_fit_samples: usize,
    /// Most recent samples scored by each refit.
    pub fit_window: usize,
    /// Time constant before any fit exists, in seconds.
    pub initial_tau_s: f64,
    /// Inclusive lower bound of the time-constant grid, in seconds.
    pub tau_min_s: f64,
    /// Inclusive upper bound of the time-constant grid, in seconds.
    pub tau_max_s: f64,
    /// Grid spacing, in seconds.
    pub tau_step_s: f64,
    /// Hysteresis: a candidate replaces the current tau only if
    /// `err(candidate) < accept_ratio * err(current)`.
    pub accept_ratio: f64,
    /// Cap on the remaining time reported by the exponential inversion.
    pub max_eta: Duration,
    /// Samples scored by `uncertainty()`.
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
            max_eta: Duration::from_secs(8 * 3600),
            uncertainty_window: 5,
        }
    }
}

impl EstimatorCfg {
    /// Number of candidates in the time-constant grid (both bounds included).
    pub fn tau_candidates(&self) -> usize {
        ((self.tau_max_s - self.tau_min_s) / self.tau_step_s).floor() as usize + 1
    }

    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.history_len == 0 {
            return Err(BuildError::InvalidConfig("history_len must be >= 1"));
        }
        if self.min_fit_samples < 2 {
            return Err(BuildError::InvalidConfig("min_fit_samples must be >= 2"));
        }
        if self.fit_window == 0 || self.fit_window > self.history_len {
            return Err(BuildError::InvalidConfig(
                "fit_window must be in 1..=history_len",
            ));
        }
        if !(self.initial_tau_s.is_finite() && self.initial_tau_s > 0.0) {
            return Err(BuildError::InvalidConfig("initial_tau_s must be > 0"));
        }
        if !(self.tau_min_s.is_finite() && self.tau_min_s > 0.0) {
            return Err(BuildError::InvalidConfig("tau_min_s must be > 0"));
        }
        if !(self.tau_max_s.is_finite() && self.tau_max_s >= self.tau_min_s) {
            return Err(BuildError::InvalidConfig("tau_max_s must be >= tau_min_s"));
        }
        if !(self.tau_step_s.is_finite() && self.tau_step_s > 0.0) {
            return Err(BuildError::InvalidConfig("tau_step_s must be > 0"));
        }
        if !(self.accept_ratio > 0.0 && self.accept_ratio <= 1.0) {
            return Err(BuildError::InvalidConfig("accept_ratio must be in (0, 1]"));
        }
        if self.max_eta.is_zero() {
            return Err(BuildError::InvalidConfig("max_eta must be > 0"));
        }
        if self.uncertainty_window == 0 {
            return Err(BuildError::InvalidConfig("uncertainty_window must be >= 1"));
        }
        Ok(())
    }
}

/// Rate heuristic parameters.
#[derive(Debug, Clone)]
pub struct FallbackCfg {
    /// Most recent samples considered for the base rate.
    pub window: usize,
    /// Sentinel for "effectively stalled"; also the exclusive ceiling for
    /// trusting the exponential estimate.
    pub max_eta: Duration,
}

impl Default for FallbackCfg {
    fn default() -> Self {
        Self {
            window: 5,
            max_eta: Duration::from_secs(24 * 3600),
        }
    }
}

impl FallbackCfg {
    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.window < 2 {
            return Err(BuildError::InvalidConfig("fallback window must be >= 2"));
        }
        if self.max_eta.is_zero() {
            return Err(BuildError::InvalidConfig("fallback max_eta must be > 0"));
        }
        Ok(())
    }
}

/// Monitor loop settings.
#[derive(Debug, Clone)]
pub struct MonitorCfg {
    /// Log a stall warning after this long without telemetry.
    pub stall_timeout: Duration,
    /// Capacity of the sampler -> monitor channel.
    pub channel_capacity: usize,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(60),
            channel_capacity: 64,
        }
    }
}
