//! `From` implementations bridging `grillmon_config` types to `grillmon_core` types.

use std::time::Duration;

use crate::config::{EstimatorCfg, FallbackCfg, MonitorCfg};

// ── EstimatorCfg ─────────────────────────────────────────────────────────────

impl From<&grillmon_config::EstimatorCfg> for EstimatorCfg {
    fn from(c: &grillmon_config::EstimatorCfg) -> Self {
        Self {
            history_len: c.history_len,
            min_fit_samples: c.min_fit_samples,
            fit_window: c.fit_window,
            initial_tau_s: c.initial_tau_s,
            tau_min_s: c.tau_min_s,
            tau_max_s: c.tau_max_s,
            tau_step_s: c.tau_step_s,
            accept_ratio: c.accept_ratio,
            max_eta: Duration::from_secs(c.max_eta_s),
            uncertainty_window: c.uncertainty_window,
        }
    }
}

// ── FallbackCfg ──────────────────────────────────────────────────────────────

impl From<&grillmon_config::FallbackCfg> for FallbackCfg {
    fn from(c: &grillmon_config::FallbackCfg) -> Self {
        Self {
            window: c.window,
            max_eta: Duration::from_secs(c.max_eta_s),
        }
    }
}

// ── MonitorCfg ───────────────────────────────────────────────────────────────

impl From<&grillmon_config::MonitorCfg> for MonitorCfg {
    fn from(c: &grillmon_config::MonitorCfg) -> Self {
        Self {
            stall_timeout: Duration::from_millis(c.stall_timeout_ms),
            channel_capacity: c.channel_capacity,
        }
    }
}
