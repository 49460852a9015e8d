//! Plain data records shared by the estimators.

use chrono::{DateTime, Utc};

/// A single recorded sample. All temperatures share the grill's unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub probe_temp: f64,
    pub probe_target: f64,
    pub chamber_temp: f64,
    pub chamber_set_point: f64,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        probe_temp: f64,
        timestamp: DateTime<Utc>,
        probe_target: f64,
        chamber_temp: f64,
        chamber_set_point: f64,
    ) -> Self {
        Self {
            probe_temp,
            probe_target,
            chamber_temp,
            chamber_set_point,
            timestamp,
        }
    }
}
