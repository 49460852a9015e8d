//! Replay a recorded cook as if it were live and score the predictions.
//!
//! Each entry is fed to a fresh [`EtaEstimator`] whose clock is pinned to the
//! entry's timestamp, so "now" inside the model is the moment the sample was
//! taken rather than the moment of the replay.

use std::io::BufRead;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::WrapErr;
use grillmon_traits::ManualClock;
use serde::Serialize;

use crate::blender::{EtaEstimator, EtaSource};
use crate::config::{EstimatorCfg, FallbackCfg};
use crate::error::Result;
use crate::telemetry::{Status, Units};

/// Read JSON-lines statuses, keeping only decodable lines that carry probe data.
pub fn load_history<R: BufRead>(reader: R) -> Result<Vec<Status>> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.wrap_err_with(|| format!("read history line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match Status::from_json_line(line.as_bytes()) {
            Ok(s) if s.observation().is_some() => out.push(s),
            Ok(_) => {}
            Err(e) => tracing::trace!(line = idx + 1, error = %e, "skipping history line"),
        }
    }
    Ok(out)
}

/// Remaining time until the known finish, or `Done` once it has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actual {
    Remaining(#[serde(serialize_with = "secs")] Duration),
    Done,
}

fn secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// Signed prediction error in percent of the actual remaining time.
///
/// Defined only when both durations are positive.
pub fn accuracy_percent(eta: Duration, actual_remaining: Duration) -> Option<f64> {
    if eta.is_zero() || actual_remaining.is_zero() {
        return None;
    }
    let actual = actual_remaining.as_secs_f64();
    Some((eta.as_secs_f64() - actual) / actual * 100.0)
}

/// What the estimator would have said at one recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub time: DateTime<Utc>,
    /// Seconds since the previous entry; 0 for the first.
    pub delta_s: f64,
    pub grill: i32,
    pub probe: i32,
    pub target: i32,
    /// Observed probe rate between consecutive entries, degrees per hour.
    pub observed_rate: f64,
    pub filtered_temp: f64,
    #[serde(serialize_with = "secs", rename = "exp_eta_s")]
    pub exponential_eta: Duration,
    #[serde(serialize_with = "secs", rename = "eta_s")]
    pub eta: Duration,
    pub source: EtaSource,
    pub uncertainty: f64,
    pub time_constant: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Actual>,
    /// Exponential ETA error in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl ForecastRow {
    /// Wall-clock finish implied by the exponential model.
    pub fn predicted_finish(&self) -> Option<DateTime<Utc>> {
        if self.exponential_eta.is_zero() {
            return None;
        }
        let eta = chrono::Duration::from_std(self.exponential_eta).ok()?;
        self.time.checked_add_signed(eta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub entries: usize,
    pub units: Units,
    pub first_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
    #[serde(serialize_with = "secs", rename = "monitored_s")]
    pub monitored: Duration,
    /// First entry to the known finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cook_s: Option<u64>,
    pub start_probe: i32,
    pub end_probe: i32,
    pub target: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Forecast {
    pub rows: Vec<ForecastRow>,
    /// `None` when no entry carried probe data.
    pub summary: Option<ForecastSummary>,
}

/// Replay `entries` in order. Entries without probe data are skipped.
pub fn forecast(
    entries: &[Status],
    actual_finish: Option<DateTime<Utc>>,
    estimator: &EstimatorCfg,
    fallback: &FallbackCfg,
) -> Result<Forecast> {
    let clock = ManualClock::default();
    let mut est = EtaEstimator::builder()
        .with_config(estimator.clone())
        .with_fallback(fallback.clone())
        .with_clock(clock.clone())
        .try_build()?;

    let mut rows: Vec<ForecastRow> = Vec::with_capacity(entries.len());
    let mut used: Vec<&Status> = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(obs) = entry.observation() else {
            continue;
        };
        let (delta_s, observed_rate) = match used.last() {
            Some(prev) => {
                let dt = secs_between(prev.time, entry.time);
                let rate = if dt > 0.0 {
                    f64::from(entry.probe - prev.probe) / dt * 3600.0
                } else {
                    0.0
                };
                (dt, rate)
            }
            None => (0.0, 0.0),
        };

        clock.set(entry.time);
        let out = est.observe(obs);

        let actual = actual_finish.map(|finish| {
            match finish.signed_duration_since(entry.time).to_std() {
                Ok(d) if !d.is_zero() => Actual::Remaining(d),
                _ => Actual::Done,
            }
        });
        let accuracy = match actual {
            Some(Actual::Remaining(d)) => accuracy_percent(out.exponential_eta, d),
            _ => None,
        };

        rows.push(ForecastRow {
            time: entry.time,
            delta_s,
            grill: entry.grill,
            probe: entry.probe,
            target: entry.probe_set,
            observed_rate,
            filtered_temp: out.filtered_temp,
            exponential_eta: out.exponential_eta,
            eta: out.eta,
            source: out.source,
            uncertainty: out.uncertainty,
            time_constant: out.time_constant,
            actual,
            accuracy,
        });
        used.push(entry);
    }

    let summary = match (used.first(), used.last(), rows.last()) {
        (Some(first), Some(last), Some(last_row)) => Some(ForecastSummary {
            entries: rows.len(),
            units: last.units,
            first_time: first.time,
            last_time: last.time,
            monitored: last
                .time
                .signed_duration_since(first.time)
                .to_std()
                .unwrap_or_default(),
            total_cook_s: actual_finish.map(|f| {
                f.signed_duration_since(first.time)
                    .to_std()
                    .unwrap_or_default()
                    .as_secs()
            }),
            start_probe: first.probe,
            end_probe: last.probe,
            target: last.probe_set,
            final_accuracy: last_row.accuracy,
        }),
        _ => None,
    };

    tracing::debug!(rows = rows.len(), skipped = entries.len() - rows.len(), "forecast complete");
    Ok(Forecast { rows, summary })
}

fn secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from).num_milliseconds() as f64 / 1000.0
}
