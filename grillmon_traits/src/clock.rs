use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Wall-clock abstraction shared by the estimator and the monitor loop.
///
/// - now(): returns the current UTC instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - secs_since(): helper to compute elapsed seconds from an epoch instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, d: Duration);

    /// Seconds elapsed since `epoch` with millisecond resolution.
    /// Negative when `epoch` lies in the future of this clock.
    fn secs_since(&self, epoch: DateTime<Utc>) -> f64 {
        let delta = self.now().signed_duration_since(epoch);
        delta.num_milliseconds() as f64 / 1000.0
    }
}

/// Default, real-time clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time is set or advanced by hand.
///
/// Used by replay (time follows the recorded samples) and by tests.
/// sleep(d) advances the internal time by d without actually sleeping.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut now) = self.now.lock() {
            let step = chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero());
            *now += step;
        }
    }

    /// Jump to an absolute instant (may move backwards).
    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|g| *g)
            .unwrap_or(DateTime::<Utc>::default())
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_sets() {
        let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(t0);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.secs_since(t0), 90.0);

        clock.sleep(Duration::from_millis(500));
        assert_eq!(clock.secs_since(t0), 90.5);

        clock.set(t0 - chrono::Duration::seconds(10));
        assert_eq!(clock.secs_since(t0), -10.0);
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), other.now());
    }
}
