//! Session-level estimator: exponential model with a linear safety net.

use std::sync::Arc;
use std::time::Duration;

use grillmon_traits::clock::{Clock, SystemClock};
use serde::Serialize;

use crate::config::{EstimatorCfg, FallbackCfg};
use crate::error::Result;
use crate::exponential::ExponentialModel;
use crate::history::SampleHistory;
use crate::types::Observation;

/// Which estimator produced [`BlendedEta::eta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EtaSource {
    Exponential,
    Linear,
}

impl EtaSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EtaSource::Exponential => "exponential",
            EtaSource::Linear => "linear",
        }
    }
}

impl core::fmt::Display for EtaSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one [`EtaEstimator::observe`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedEta {
    pub eta: Duration,
    pub source: EtaSource,
    /// Raw exponential answer, reported even when it was not selected.
    pub exponential_eta: Duration,
    pub filtered_temp: f64,
    /// Degrees per second.
    pub velocity: f64,
    pub uncertainty: f64,
    /// Seconds.
    pub time_constant: f64,
}

/// One estimator per cooking session.
#[derive(Debug)]
pub struct EtaEstimator {
    model: ExponentialModel,
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self {
            model: ExponentialModel::new(),
        }
    }
}

impl EtaEstimator {
    pub fn builder() -> EtaEstimatorBuilder {
        EtaEstimatorBuilder::default()
    }

    pub fn model(&self) -> &ExponentialModel {
        &self.model
    }

    pub fn history(&self) -> &SampleHistory {
        self.model.history()
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_initialized()
    }

    /// Record `obs` and answer the remaining time to its probe target.
    ///
    /// The exponential answer is used when it is strictly inside
    /// `(0, fallback max_eta)`; otherwise the linear heuristic answers.
    pub fn observe(&mut self, obs: Observation) -> BlendedEta {
        self.model.record(obs);

        let target = obs.probe_target;
        let exponential_eta = self.model.estimate_time_to_target(target);
        let fallback = self.model.fallback();
        let trusted = self.model.is_initialized()
            && !exponential_eta.is_zero()
            && exponential_eta < fallback.cfg().max_eta;

        let (eta, source) = if trusted {
            (exponential_eta, EtaSource::Exponential)
        } else {
            let latest = self.model.history().latest().copied().unwrap_or(obs);
            (
                fallback.estimate(self.model.history(), &latest, target),
                EtaSource::Linear,
            )
        };

        let (filtered_temp, velocity) = self.model.current_state_and_velocity();
        let out = BlendedEta {
            eta,
            source,
            exponential_eta,
            filtered_temp,
            velocity,
            uncertainty: self.model.uncertainty(),
            time_constant: self.model.time_constant(),
        };
        tracing::debug!(
            eta_s = eta.as_secs(),
            source = source.as_str(),
            exp_eta_s = exponential_eta.as_secs(),
            filtered_temp,
            velocity_per_h = velocity * 3600.0,
            uncertainty = out.uncertainty,
            tau_s = out.time_constant,
            "eta"
        );
        out
    }
}

/// Builder for [`EtaEstimator`]. Configs are validated on `try_build()`.
#[derive(Default)]
pub struct EtaEstimatorBuilder {
    estimator: Option<EstimatorCfg>,
    fallback: Option<FallbackCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl EtaEstimatorBuilder {
    pub fn with_config(mut self, cfg: EstimatorCfg) -> Self {
        self.estimator = Some(cfg);
        self
    }

    pub fn with_fallback(mut self, cfg: FallbackCfg) -> Self {
        self.fallback = Some(cfg);
        self
    }

    /// Inject a clock (tests and replay use `ManualClock`).
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Send + Sync + 'static,
    {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn try_build(self) -> Result<EtaEstimator> {
        let EtaEstimatorBuilder {
            estimator,
            fallback,
            clock,
        } = self;

        let estimator = estimator.unwrap_or_default();
        let fallback = fallback.unwrap_or_default();
        estimator.validate().map_err(eyre::Report::new)?;
        fallback.validate().map_err(eyre::Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(SystemClock::new()),
        };
        Ok(EtaEstimator {
            model: ExponentialModel::with_parts(estimator, fallback, clock),
        })
    }
}

impl core::fmt::Debug for EtaEstimatorBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EtaEstimatorBuilder")
            .field("estimator", &self.estimator)
            .field("fallback", &self.fallback)
            .field("clock", &self.clock.as_ref().map(|_| "custom"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use chrono::{DateTime, Utc};
    use grillmon_traits::ManualClock;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_observation_uses_exponential() {
        let mut est = EtaEstimator::builder()
            .with_clock(ManualClock::new(t(0)))
            .try_build()
            .unwrap();
        let out = est.observe(Observation::new(100.0, t(0), 200.0, 250.0, 250.0));
        // Eq = 210; t = -3600 ln(10/110)
        assert!(est.is_initialized());
        assert_eq!(out.time_constant, 3600.0);
        assert_eq!(out.filtered_temp, 100.0);
        assert!(out.eta > Duration::ZERO);
        assert_eq!(out.source, EtaSource::Exponential);
    }

    #[test]
    fn reached_target_selects_linear_zero() {
        let mut est = EtaEstimator::builder()
            .with_clock(ManualClock::new(t(0)))
            .try_build()
            .unwrap();
        est.observe(Observation::new(150.0, t(0), 200.0, 250.0, 250.0));
        let out = est.observe(Observation::new(205.0, t(600), 200.0, 250.0, 250.0));
        assert_eq!(out.exponential_eta, Duration::ZERO);
        assert_eq!(out.source, EtaSource::Linear);
        assert_eq!(out.eta, Duration::ZERO);
    }

    #[test]
    fn invalid_config_is_build_error() {
        let cfg = EstimatorCfg {
            tau_step_s: 0.0,
            ..EstimatorCfg::default()
        };
        let err = EtaEstimator::builder().with_config(cfg).try_build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }
}
