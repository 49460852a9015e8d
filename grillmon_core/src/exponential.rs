//! Single-time-constant exponential approach model.
//!
//! The probe follows `T(t) = Eq - (Eq - T0) * exp(-(t - t0) / tau)` where `T0`
//! and `t0` are anchored at the first observation of the session and `Eq` is
//! an *effective* equilibrium derived from the chamber readings (see
//! [`effective_equilibrium`]). Only `tau` is refit as samples arrive, by a
//! fixed grid search with hysteresis.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use grillmon_traits::clock::{Clock, SystemClock};

use crate::config::{EstimatorCfg, FallbackCfg};
use crate::fallback::LinearFallback;
use crate::history::SampleHistory;
use crate::types::Observation;

/// Below this distance between start temperature and equilibrium the
/// inversion is considered degenerate.
const DEGENERATE_SPAN: f64 = 0.1;
/// Uncertainty reported before any fit is possible.
pub const UNCERTAINTY_NO_FIT: f64 = 5.0;
/// Uncertainty reported while the residual window is still filling.
pub const UNCERTAINTY_WARMING: f64 = 2.0;

/// Damping in `[0.5, 1.0]` from how far the chamber runs from its set-point.
#[inline]
pub fn chamber_stability(chamber_temp: f64, chamber_set_point: f64) -> f64 {
    (1.0 - (chamber_temp - chamber_set_point).abs() / 50.0).clamp(0.5, 1.0)
}

/// Asymptote the probe approaches given chamber heat output and stability.
///
/// A hot chamber lets the probe run somewhat past its target; a chamber at or
/// below target caps it under the chamber temperature. An unstable chamber
/// pulls the result back toward the nominal target.
pub fn effective_equilibrium(chamber_temp: f64, chamber_set_point: f64, target: f64) -> f64 {
    let delta = chamber_temp - target;
    let eq = if delta > 50.0 {
        target + (delta * 0.1).min(10.0)
    } else if delta > 20.0 {
        target + delta * 0.2
    } else if delta > 0.0 {
        target + delta * 0.5
    } else {
        chamber_temp + (delta * 0.3).max(-20.0)
    };
    target + (eq - target) * chamber_stability(chamber_temp, chamber_set_point)
}

/// Anchors and current readings of an initialized model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelState {
    pub start_temp: f64,
    pub start_time: DateTime<Utc>,
    pub current_target: f64,
    pub current_chamber_temp: f64,
    pub current_chamber_set_point: f64,
    /// Seconds; always finite and > 0.
    pub time_constant: f64,
}

impl ModelState {
    fn elapsed_s(&self, at: DateTime<Utc>) -> f64 {
        at.signed_duration_since(self.start_time).num_milliseconds() as f64 / 1000.0
    }

    /// Curve value `elapsed_s` seconds after start toward `eq` with time constant `tau`.
    #[inline]
    fn curve(&self, eq: f64, elapsed_s: f64, tau: f64) -> f64 {
        if elapsed_s < 0.0 {
            return self.start_temp;
        }
        eq - (eq - self.start_temp) * (-elapsed_s / tau).exp()
    }

    /// Equilibrium from the current readings.
    fn current_equilibrium(&self) -> f64 {
        effective_equilibrium(
            self.current_chamber_temp,
            self.current_chamber_set_point,
            self.current_target,
        )
    }

    /// Retrodicted temperature at a recorded sample using its own chamber readings.
    fn retrodict(&self, obs: &Observation, tau: f64) -> f64 {
        let eq = effective_equilibrium(
            obs.chamber_temp,
            obs.chamber_set_point,
            self.current_target,
        );
        self.curve(eq, self.elapsed_s(obs.timestamp), tau)
    }
}

/// Online exponential approach predictor for one cooking session.
pub struct ExponentialModel {
    cfg: EstimatorCfg,
    fallback: LinearFallback,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Option<ModelState>,
    history: SampleHistory,
}

impl core::fmt::Debug for ExponentialModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExponentialModel")
            .field("state", &self.state)
            .field("samples", &self.history.len())
            .finish()
    }
}

impl Default for ExponentialModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialModel {
    /// Model with default parameters on the system clock.
    pub fn new() -> Self {
        Self::with_parts(
            EstimatorCfg::default(),
            FallbackCfg::default(),
            Arc::new(SystemClock::new()),
        )
    }

    /// Model on an injected clock; configs are trusted (see `EtaEstimatorBuilder`
    /// for the validating path).
    pub fn with_parts(
        cfg: EstimatorCfg,
        fallback: FallbackCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let history = SampleHistory::with_capacity(cfg.history_len);
        Self {
            cfg,
            fallback: LinearFallback::new(fallback),
            clock,
            state: None,
            history,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&ModelState> {
        self.state.as_ref()
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn fallback(&self) -> &LinearFallback {
        &self.fallback
    }

    /// Current time constant in seconds (the initial value before any fit).
    pub fn time_constant(&self) -> f64 {
        self.state
            .map_or(self.cfg.initial_tau_s, |s| s.time_constant)
    }

    /// Ingest one measurement.
    pub fn update(
        &mut self,
        probe_temp: f64,
        timestamp: DateTime<Utc>,
        probe_target: f64,
        chamber_temp: f64,
        chamber_set_point: f64,
    ) {
        self.record(Observation::new(
            probe_temp,
            timestamp,
            probe_target,
            chamber_temp,
            chamber_set_point,
        ));
    }

    /// Ingest one observation; see [`ExponentialModel::update`].
    pub fn record(&mut self, obs: Observation) {
        let Some(state) = self.state.as_mut() else {
            self.state = Some(ModelState {
                start_temp: obs.probe_temp,
                start_time: obs.timestamp,
                current_target: obs.probe_target,
                current_chamber_temp: obs.chamber_temp,
                current_chamber_set_point: obs.chamber_set_point,
                time_constant: self.cfg.initial_tau_s,
            });
            self.history.record(obs);
            tracing::debug!(
                start_temp = obs.probe_temp,
                target = obs.probe_target,
                "exponential model initialized"
            );
            return;
        };

        state.current_target = obs.probe_target;
        state.current_chamber_temp = obs.chamber_temp;
        state.current_chamber_set_point = obs.chamber_set_point;
        self.history.record(obs);

        if self.history.len() >= self.cfg.min_fit_samples {
            self.estimate_time_constant();
        }
    }

    /// Modelled probe temperature at `at` using the current readings.
    pub fn predict(&self, at: DateTime<Utc>) -> f64 {
        let Some(state) = &self.state else {
            return 0.0;
        };
        state.curve(
            state.current_equilibrium(),
            state.elapsed_s(at),
            state.time_constant,
        )
    }

    /// Remaining time until the probe reaches `target`.
    pub fn estimate_time_to_target(&self, target: f64) -> Duration {
        let (Some(state), Some(latest)) = (&self.state, self.history.latest()) else {
            return Duration::ZERO;
        };
        let current = latest.probe_temp;
        if current >= target {
            return Duration::ZERO;
        }

        let eq = effective_equilibrium(
            state.current_chamber_temp,
            state.current_chamber_set_point,
            target,
        );
        let mut solve_for = target;
        if target > eq {
            // Unreachable under current chamber conditions: report time to the
            // best achievable temperature instead.
            if current >= eq {
                return Duration::ZERO;
            }
            solve_for = eq;
        }

        let denominator = state.start_temp - eq;
        if denominator.abs() < DEGENERATE_SPAN {
            tracing::trace!(eq, start_temp = state.start_temp, "degenerate span; linear fallback");
            return self.fallback.estimate(&self.history, latest, solve_for);
        }
        let ratio = (solve_for - eq) / denominator;
        if !(ratio > 0.0 && ratio < 1.0) {
            tracing::trace!(ratio, eq, "ratio outside (0, 1); linear fallback");
            return self.fallback.estimate(&self.history, latest, solve_for);
        }

        let solved_s = -state.time_constant * ratio.ln();
        let remaining_s = solved_s - self.clock.secs_since(state.start_time);
        if !remaining_s.is_finite() {
            return self.fallback.estimate(&self.history, latest, solve_for);
        }
        let max_s = self.cfg.max_eta.as_secs_f64();
        Duration::from_secs_f64(remaining_s.clamp(0.0, max_s))
    }

    /// Latest recorded temperature and the curve's slope (deg/s) at clock "now".
    pub fn current_state_and_velocity(&self) -> (f64, f64) {
        let (Some(state), Some(latest)) = (&self.state, self.history.latest()) else {
            return (0.0, 0.0);
        };
        let tau = state.time_constant;
        let elapsed = self.clock.secs_since(state.start_time).max(0.0);
        let velocity = (state.current_equilibrium() - state.start_temp) / tau * (-elapsed / tau).exp();
        (latest.probe_temp, velocity)
    }

    /// Mean absolute residual over the most recent samples.
    pub fn uncertainty(&self) -> f64 {
        let Some(state) = &self.state else {
            return UNCERTAINTY_NO_FIT;
        };
        if self.history.len() < self.cfg.min_fit_samples {
            return UNCERTAINTY_NO_FIT;
        }
        let window = self.cfg.uncertainty_window;
        let residuals: Vec<f64> = self
            .history
            .last_n(window)
            .filter(|o| o.timestamp >= state.start_time)
            .map(|o| (state.retrodict(o, state.time_constant) - o.probe_temp).abs())
            .collect();
        if residuals.len() < window {
            return UNCERTAINTY_WARMING;
        }
        residuals.iter().sum::<f64>() / residuals.len() as f64
    }

    /// Mean squared error of the curve with time constant `tau` over the fit window.
    fn fit_error(&self, state: &ModelState, tau: f64) -> f64 {
        let mut sum = 0.0;
        let mut n = 0usize;
        for o in self.history.last_n(self.cfg.fit_window) {
            let err = state.retrodict(o, tau) - o.probe_temp;
            sum += err * err;
            n += 1;
        }
        if n == 0 {
            return f64::INFINITY;
        }
        sum / n as f64
    }

    fn estimate_time_constant(&mut self) {
        let Some(state) = self.state else {
            return;
        };
        let current_err = self.fit_error(&state, state.time_constant);

        let mut best_tau = state.time_constant;
        let mut best_err = f64::INFINITY;
        for i in 0..self.cfg.tau_candidates() {
            let tau = self.cfg.tau_min_s + i as f64 * self.cfg.tau_step_s;
            let err = self.fit_error(&state, tau);
            if err < best_err {
                best_err = err;
                best_tau = tau;
            }
        }

        if best_err < self.cfg.accept_ratio * current_err {
            if let Some(s) = self.state.as_mut() {
                s.time_constant = best_tau;
            }
            tracing::debug!(
                old_tau = state.time_constant,
                new_tau = best_tau,
                old_mse = current_err,
                new_mse = best_err,
                "time constant refit"
            );
        }
    }
}
