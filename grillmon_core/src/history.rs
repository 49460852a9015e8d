//! Bounded, time-ordered buffer of recent observations.

use std::collections::VecDeque;

use crate::types::Observation;

/// Default number of observations retained.
pub const DEFAULT_HISTORY_LEN: usize = 20;

/// FIFO buffer holding at most `cap` observations, oldest first.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    buf: VecDeque<Observation>,
    cap: usize,
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LEN)
    }
}

impl SampleHistory {
    /// Create an empty history; `cap` is clamped to at least 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            buf: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    /// Append and evict from the front once the cap is exceeded.
    pub fn record(&mut self, obs: Observation) {
        self.buf.push_back(obs);
        while self.buf.len() > self.cap {
            self.buf.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.buf.back()
    }

    pub fn oldest(&self) -> Option<&Observation> {
        self.buf.front()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Observation> + ExactSizeIterator {
        self.buf.iter()
    }

    /// The `n` most recent observations, oldest first.
    pub fn last_n(&self, n: usize) -> impl DoubleEndedIterator<Item = &Observation> + ExactSizeIterator {
        let skip = self.buf.len().saturating_sub(n);
        self.buf.iter().skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn obs(i: i64) -> Observation {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000 + i * 60, 0).unwrap();
        Observation::new(100.0 + i as f64, t, 200.0, 250.0, 250.0)
    }

    #[test]
    fn evicts_oldest_beyond_cap() {
        let mut h = SampleHistory::with_capacity(3);
        for i in 0..5 {
            h.record(obs(i));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.oldest().unwrap().probe_temp, 102.0);
        assert_eq!(h.latest().unwrap().probe_temp, 104.0);
    }

    #[test]
    fn last_n_is_oldest_first_and_saturates() {
        let mut h = SampleHistory::default();
        for i in 0..4 {
            h.record(obs(i));
        }
        let tail: Vec<f64> = h.last_n(2).map(|o| o.probe_temp).collect();
        assert_eq!(tail, vec![102.0, 103.0]);
        assert_eq!(h.last_n(10).len(), 4);
        assert_eq!(h.last_n(0).len(), 0);
    }

    #[test]
    fn empty_history_queries_are_none() {
        let h = SampleHistory::with_capacity(0);
        assert_eq!(h.capacity(), 1);
        assert!(h.is_empty());
        assert!(h.latest().is_none());
        assert!(h.oldest().is_none());
    }
}
