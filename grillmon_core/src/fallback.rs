//! Rate-based remaining-time heuristic.
//!
//! Used when the exponential model is degenerate and as the alternate
//! estimator of the blender. A falling or flat probe is given a tiny synthetic
//! rate so the answer degrades to "very long" instead of undefined.

use std::time::Duration;

use crate::config::FallbackCfg;
use crate::history::SampleHistory;
use crate::types::Observation;

/// Synthetic rate for a falling probe: 1 degree per hour, in degrees per second.
pub const FALLING_RATE: f64 = 1.0 / 3600.0;
/// Synthetic rate for a flat probe: 0.5 degree per hour, in degrees per second.
pub const STABLE_RATE: f64 = 0.5 / 3600.0;

const RECENT_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        }
    }
}

/// Classify a temperature change and map it to a strictly positive rate (deg/s).
fn trend_rate(temp_change: f64, span_s: f64) -> (Trend, f64) {
    if temp_change > 0.0 {
        (Trend::Rising, temp_change / span_s)
    } else if temp_change < 0.0 {
        (Trend::Falling, FALLING_RATE)
    } else {
        (Trend::Stable, STABLE_RATE)
    }
}

/// Every intermediate of one heuristic evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBreakdown {
    pub trend: Trend,
    pub temp_change: f64,
    pub span_s: f64,
    pub base_rate: f64,
    pub recent_rate: Option<f64>,
    pub chamber_adj: f64,
    pub differential_adj: f64,
    pub stage_adj: f64,
    pub stability_adj: f64,
    pub adjusted_rate: f64,
    /// Unclamped estimate in seconds.
    pub eta_s: f64,
}

/// Chamber still heating toward its set-point speeds the probe up; overshoot
/// makes the approach less predictable.
pub fn chamber_trend_factor(chamber_temp: f64, chamber_set_point: f64) -> f64 {
    if chamber_temp < chamber_set_point {
        1.15
    } else if chamber_temp > chamber_set_point {
        0.95
    } else {
        1.0
    }
}

/// Heat transfer slows as probe and chamber temperatures converge.
pub fn differential_factor(chamber_temp: f64, probe_temp: f64) -> f64 {
    let diff = chamber_temp - probe_temp;
    if diff > 50.0 {
        1.1
    } else if diff < 10.0 {
        0.6
    } else if diff < 20.0 {
        0.8
    } else {
        1.0
    }
}

/// Early cooks run faster than the final approach.
pub fn stage_factor(probe_temp: f64, target: f64) -> f64 {
    let progress = probe_temp / target;
    if !progress.is_finite() {
        return 1.0;
    }
    if progress < 0.3 {
        1.05
    } else if progress > 0.8 {
        0.85
    } else {
        1.0
    }
}

/// Treat a recent rate that diverges from the base rate by more than 50 % conservatively.
pub fn stability_factor(recent_rate: Option<f64>, base_rate: f64) -> f64 {
    match recent_rate {
        Some(recent) if recent > 0.0 && base_rate > 0.0 => {
            let ratio = recent / base_rate;
            if !(0.5..=1.5).contains(&ratio) {
                0.9
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}

/// Multi-factor linear ETA heuristic.
#[derive(Debug, Clone, Default)]
pub struct LinearFallback {
    cfg: FallbackCfg,
}

impl LinearFallback {
    pub fn new(cfg: FallbackCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &FallbackCfg {
        &self.cfg
    }

    /// Remaining time until `current.probe_temp` reaches `target`.
    ///
    /// `history` may or may not already contain `current`; only samples strictly
    /// older than `current` are used as rate anchors. Returns zero when no rate
    /// can be formed or the target is already reached, and `max_eta` when the
    /// heuristic says "effectively stalled".
    pub fn estimate(&self, history: &SampleHistory, current: &Observation, target: f64) -> Duration {
        let Some(b) = self.breakdown(history, current, target) else {
            return Duration::ZERO;
        };
        let max_s = self.cfg.max_eta.as_secs_f64();
        if !(b.eta_s > 0.0) {
            Duration::ZERO
        } else if b.eta_s > max_s {
            tracing::debug!(
                calculated_h = b.eta_s / 3600.0,
                temp_trend = b.trend.as_str(),
                capped_s = max_s,
                "linear eta capped"
            );
            self.cfg.max_eta
        } else {
            Duration::from_secs_f64(b.eta_s)
        }
    }

    /// Evaluate the heuristic and return all intermediates, or `None` when no
    /// older sample with a positive time span exists.
    pub fn breakdown(
        &self,
        history: &SampleHistory,
        current: &Observation,
        target: f64,
    ) -> Option<RateBreakdown> {
        let prior: Vec<&Observation> = history
            .last_n(self.cfg.window)
            .filter(|o| o.timestamp < current.timestamp)
            .collect();
        let first = prior.first()?;

        let span_s = secs_between(first, current);
        if !(span_s > 0.0) {
            return None;
        }
        let temp_change = current.probe_temp - first.probe_temp;
        let (trend, base_rate) = trend_rate(temp_change, span_s);

        // Last two samples plus the current one
        let recent_rate = if prior.len() >= 2 {
            let start = prior[prior.len() - 2];
            let recent_span = secs_between(start, current);
            (recent_span > 0.0)
                .then(|| trend_rate(current.probe_temp - start.probe_temp, recent_span).1)
        } else {
            None
        };

        let rate = match recent_rate {
            Some(r) if r > 0.0 => r * RECENT_WEIGHT + base_rate * (1.0 - RECENT_WEIGHT),
            _ => base_rate,
        };

        let chamber_adj = chamber_trend_factor(current.chamber_temp, current.chamber_set_point);
        let differential_adj = differential_factor(current.chamber_temp, current.probe_temp);
        let stage_adj = stage_factor(current.probe_temp, target);
        let stability_adj = stability_factor(recent_rate, base_rate);
        let adjusted_rate = rate * chamber_adj * differential_adj * stage_adj * stability_adj;

        let eta_s = (target - current.probe_temp) / adjusted_rate;

        let b = RateBreakdown {
            trend,
            temp_change,
            span_s,
            base_rate,
            recent_rate,
            chamber_adj,
            differential_adj,
            stage_adj,
            stability_adj,
            adjusted_rate,
            eta_s,
        };
        tracing::trace!(
            temp_trend = trend.as_str(),
            temp_change,
            over_s = span_s,
            base_rate,
            recent_rate = recent_rate.unwrap_or(0.0),
            chamber_adj,
            differential_adj,
            stage_adj,
            stability_adj,
            final_rate = adjusted_rate,
            eta_s,
            "linear eta"
        );
        Some(b)
    }
}

#[inline]
fn secs_between(from: &Observation, to: &Observation) -> f64 {
    to.timestamp
        .signed_duration_since(from.timestamp)
        .num_milliseconds() as f64
        / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    #[rstest]
    #[case(200.0, 100.0, 1.1)]
    #[case(150.0, 100.0, 1.0)]
    #[case(119.0, 100.0, 0.8)]
    #[case(109.0, 100.0, 0.6)]
    #[case(90.0, 100.0, 0.6)]
    fn differential_bands(#[case] chamber: f64, #[case] probe: f64, #[case] expected: f64) {
        assert_eq!(differential_factor(chamber, probe), expected);
    }

    #[rstest]
    #[case(50.0, 200.0, 1.05)]
    #[case(100.0, 200.0, 1.0)]
    #[case(170.0, 200.0, 0.85)]
    #[case(50.0, 0.0, 1.0)]
    fn stage_bands(#[case] probe: f64, #[case] target: f64, #[case] expected: f64) {
        assert_eq!(stage_factor(probe, target), expected);
    }

    #[test]
    fn chamber_and_stability_factors() {
        assert_eq!(chamber_trend_factor(200.0, 225.0), 1.15);
        assert_eq!(chamber_trend_factor(240.0, 225.0), 0.95);
        assert_eq!(chamber_trend_factor(225.0, 225.0), 1.0);

        assert_eq!(stability_factor(None, 1.0), 1.0);
        assert_eq!(stability_factor(Some(1.2), 1.0), 1.0);
        assert_eq!(stability_factor(Some(1.6), 1.0), 0.9);
        assert_eq!(stability_factor(Some(0.4), 1.0), 0.9);
    }

    #[test]
    fn single_sample_yields_zero() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let o = Observation::new(100.0, t, 200.0, 250.0, 250.0);
        let mut h = SampleHistory::default();
        h.record(o);
        let fb = LinearFallback::default();
        assert_eq!(fb.estimate(&h, &o, 200.0), Duration::ZERO);
        assert!(fb.breakdown(&h, &o, 200.0).is_none());
    }

    /// Four samples 10 minutes apart; the last one is `current` and is also in history.
    fn series(probes: [f64; 4], chamber: f64, set: f64) -> (SampleHistory, Observation) {
        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut h = SampleHistory::default();
        let mut last = None;
        for (i, p) in probes.into_iter().enumerate() {
            let o = Observation::new(p, t0 + chrono::Duration::seconds(600 * i as i64), 200.0, chamber, set);
            h.record(o);
            last = Some(o);
        }
        (h, last.unwrap())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "{actual} != {expected}"
        );
    }

    // base: oldest prior -> current over 1800 s; recent: prior[1] -> current over 1200 s
    #[rstest]
    #[case::steady_rise(
        [100.0, 110.0, 120.0, 130.0], 250.0, 250.0,
        1.0 / 60.0, 1.0 / 60.0, 1.0, 1.0 / 60.0 * 1.1
    )]
    #[case::recent_surge(
        [100.0, 90.0, 95.0, 130.0], 250.0, 225.0,
        1.0 / 60.0, 1.0 / 30.0, 0.9,
        (0.7 / 30.0 + 0.3 / 60.0) * 0.95 * 1.1 * 0.9
    )]
    #[case::late_stall(
        [100.0, 160.0, 170.0, 175.0], 180.0, 180.0,
        75.0 / 1800.0, 15.0 / 1200.0, 0.9,
        (0.7 * 15.0 / 1200.0 + 0.3 * 75.0 / 1800.0) * 0.6 * 0.85 * 0.9
    )]
    fn combined_heuristic_matches_hand_computation(
        #[case] probes: [f64; 4],
        #[case] chamber: f64,
        #[case] set: f64,
        #[case] base_rate: f64,
        #[case] recent_rate: f64,
        #[case] stability_adj: f64,
        #[case] adjusted_rate: f64,
    ) {
        let (h, cur) = series(probes, chamber, set);
        let fb = LinearFallback::default();
        let b = fb.breakdown(&h, &cur, 200.0).unwrap();

        assert_eq!(b.trend, Trend::Rising);
        assert_close(b.span_s, 1800.0);
        assert_close(b.base_rate, base_rate);
        assert_close(b.recent_rate.unwrap(), recent_rate);
        assert_eq!(b.stability_adj, stability_adj);
        assert_close(b.adjusted_rate, adjusted_rate);

        let expected_eta = (200.0 - cur.probe_temp) / adjusted_rate;
        assert_close(b.eta_s, expected_eta);
        assert!(expected_eta < 86_400.0);
        let eta = fb.estimate(&h, &cur, 200.0).as_secs_f64();
        assert!((eta - expected_eta).abs() < 1e-6, "{eta} vs {expected_eta}");
    }

    #[test]
    fn flat_probe_hits_the_day_cap() {
        let (h, cur) = series([150.0; 4], 250.0, 250.0);
        let fb = LinearFallback::default();
        let b = fb.breakdown(&h, &cur, 200.0).unwrap();
        assert_eq!(b.trend, Trend::Stable);
        assert_eq!(b.recent_rate, Some(STABLE_RATE));
        // 50 degrees at 0.55 deg/h
        assert_close(b.eta_s, 50.0 / (STABLE_RATE * 1.1));
        assert!(b.eta_s > 86_400.0);
        assert_eq!(fb.estimate(&h, &cur, 200.0), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn samples_outside_window_are_ignored() {
        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut h = SampleHistory::default();
        // a cold outlier followed by five samples; window = 5 drops it
        let probes = [40.0, 100.0, 110.0, 120.0, 130.0, 140.0];
        let mut cur = None;
        for (i, p) in probes.into_iter().enumerate() {
            let o = Observation::new(p, t0 + chrono::Duration::seconds(600 * i as i64), 200.0, 250.0, 250.0);
            h.record(o);
            cur = Some(o);
        }
        let cur = cur.unwrap();
        let b = LinearFallback::default().breakdown(&h, &cur, 200.0).unwrap();
        assert_close(b.span_s, 2400.0);
        assert_close(b.base_rate, 40.0 / 2400.0);
    }
}
