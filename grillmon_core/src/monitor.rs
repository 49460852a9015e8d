//! Live monitoring loop: telemetry in, ETA-annotated statuses out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use grillmon_traits::clock::{Clock, SystemClock};

use crate::blender::{BlendedEta, EtaEstimator};
use crate::config::MonitorCfg;
use crate::error::Result;
use crate::observer::StatusObserver;
use crate::sampler::{Sampler, SamplerEvent};
use crate::telemetry::{Status, decode_payload};
use crate::util::format_duration;

/// Upper bound on how long the loop waits before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Counters accumulated over a monitoring session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorReport {
    pub seeded: usize,
    pub received: usize,
    pub decode_errors: usize,
    pub source_errors: usize,
    pub disconnected: usize,
    pub no_probe: usize,
    pub estimated: usize,
    pub stalls: usize,
}

pub struct Monitor<O: StatusObserver> {
    estimator: EtaEstimator,
    observer: O,
    cfg: MonitorCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    report: MonitorReport,
}

impl<O: StatusObserver> core::fmt::Debug for Monitor<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Monitor")
            .field("estimator", &self.estimator)
            .field("cfg", &self.cfg)
            .field("report", &self.report)
            .finish()
    }
}

impl<O: StatusObserver> Monitor<O> {
    pub fn new(estimator: EtaEstimator, observer: O, cfg: MonitorCfg) -> Self {
        Self {
            estimator,
            observer,
            cfg,
            clock: Arc::new(SystemClock::new()),
            report: MonitorReport::default(),
        }
    }

    /// Clock used for stall detection.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn estimator(&self) -> &EtaEstimator {
        &self.estimator
    }

    pub fn report(&self) -> MonitorReport {
        self.report
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Prime the estimator with previously logged statuses. Entries without
    /// probe data are ignored. Returns the number of observations fed.
    pub fn seed(&mut self, history: &[Status]) -> usize {
        if history.is_empty() {
            return 0;
        }
        tracing::info!(entries = history.len(), "initializing predictor with historical data");
        let mut fed = 0;
        for obs in history.iter().filter_map(Status::observation) {
            self.estimator.observe(obs);
            fed += 1;
        }
        let model = self.estimator.model();
        let (temperature, velocity) = model.current_state_and_velocity();
        tracing::info!(
            fed,
            temperature,
            velocity_deg_per_hour = velocity * 3600.0,
            uncertainty = model.uncertainty(),
            "exponential predictor initialized"
        );
        self.report.seeded += fed;
        fed
    }

    /// Decode one raw payload and process it. Undecodable payloads are logged
    /// and counted, not returned as errors.
    pub fn handle_payload(&mut self, bytes: &[u8]) -> Result<Option<BlendedEta>> {
        self.report.received += 1;
        match decode_payload(bytes) {
            Ok(status) => self.process(status),
            Err(e) => {
                self.report.decode_errors += 1;
                tracing::error!(error = %e, "invalid status");
                Ok(None)
            }
        }
    }

    /// Process one decoded status: feed the estimator, attach `probe_eta`,
    /// log, and pass it to the observer. Disconnected statuses are dropped.
    pub fn process(&mut self, mut status: Status) -> Result<Option<BlendedEta>> {
        if !status.connected {
            self.report.disconnected += 1;
            tracing::warn!("grill disconnected");
            return Ok(None);
        }

        let blended = match status.observation() {
            Some(obs) => Some(self.estimator.observe(obs)),
            None => {
                self.report.no_probe += 1;
                None
            }
        };

        let mut eta_fields: Option<(String, &'static str)> = None;
        if let Some(b) = &blended
            && status.probe < status.probe_set
        {
            let eta = Duration::from_secs(b.eta.as_secs());
            if !eta.is_zero() {
                status.probe_eta = Some(eta);
                self.report.estimated += 1;
                eta_fields = Some((format_duration(eta), b.source.as_str()));
            }
        }

        let probe_connected = status.probe_connected;
        tracing::info!(
            status = %status.system_status,
            units = %status.units,
            ambient = status.ambient,
            grill = status.grill,
            grill_set = status.grill_set,
            probe = probe_connected.then_some(status.probe),
            probe_set = probe_connected.then_some(status.probe_set),
            probe_alarm = probe_connected.then_some(status.probe_alarm_fired),
            probe_eta = eta_fields.as_ref().map(|(e, _)| e.as_str()),
            eta_source = eta_fields.as_ref().map(|(_, s)| *s),
            ""
        );

        self.observer.observe(&status)?;
        Ok(blended)
    }

    /// Drain `sampler` until the stream ends or `stop` is raised.
    pub fn run(&mut self, sampler: &Sampler, stop: &AtomicBool) -> Result<MonitorReport> {
        let poll = POLL_INTERVAL.min(self.cfg.stall_timeout);
        let stall_ms = i64::try_from(self.cfg.stall_timeout.as_millis()).unwrap_or(i64::MAX);
        let mut last_activity = self.clock.now();

        loop {
            if stop.load(Ordering::Relaxed) {
                tracing::info!("interrupted, stopping");
                break;
            }
            match sampler.recv_timeout(poll) {
                Ok(SamplerEvent::Payload(bytes)) => {
                    last_activity = self.clock.now();
                    self.handle_payload(&bytes)?;
                }
                Ok(SamplerEvent::Error(e)) => {
                    self.report.source_errors += 1;
                    tracing::warn!(error = %e, "telemetry source error");
                }
                Ok(SamplerEvent::End) => {
                    tracing::info!("telemetry stream ended");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = self.clock.now();
                    let idle_ms = now.signed_duration_since(last_activity).num_milliseconds();
                    if idle_ms >= stall_ms {
                        self.report.stalls += 1;
                        tracing::warn!(idle_s = idle_ms / 1000, "no telemetry received");
                        last_activity = now;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("sampler channel closed");
                    break;
                }
            }
        }

        self.observer.flush()?;
        tracing::info!(
            received = self.report.received,
            estimated = self.report.estimated,
            decode_errors = self.report.decode_errors,
            disconnected = self.report.disconnected,
            stalls = self.report.stalls,
            "monitor finished"
        );
        Ok(self.report)
    }
}
