//! Grill status records and their two wire forms.
//!
//! - The raw `prod/thing/update` envelope pushed by the cloud broker
//!   (`{"status": {..., "set": 225, "probe_con": 1, "time": <unix>}}`).
//! - The cleaned JSON-lines log written by the monitor, one [`Status`] per line,
//!   with `probe_eta` as a Go-style duration string.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GrillError;
use crate::types::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
    Unknown(i32),
}

impl From<i32> for Units {
    fn from(v: i32) -> Self {
        match v {
            0 => Units::Celsius,
            1 => Units::Fahrenheit,
            other => Units::Unknown(other),
        }
    }
}

impl From<Units> for i32 {
    fn from(u: Units) -> Self {
        match u {
            Units::Celsius => 0,
            Units::Fahrenheit => 1,
            Units::Unknown(v) => v,
        }
    }
}

impl Units {
    pub fn symbol(self) -> &'static str {
        match self {
            Units::Celsius => "°C",
            Units::Fahrenheit => "°F",
            Units::Unknown(_) => "°",
        }
    }
}

impl core::fmt::Display for Units {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Units::Celsius => f.write_str("celsius"),
            Units::Fahrenheit => f.write_str("fahrenheit"),
            Units::Unknown(v) => write!(f, "Units({v})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SystemStatus {
    Ready,
    Offline,
    #[default]
    Unset,
    Other(i32),
}

impl From<i32> for SystemStatus {
    fn from(v: i32) -> Self {
        match v {
            0 => SystemStatus::Unset,
            3 => SystemStatus::Ready,
            99 => SystemStatus::Offline,
            other => SystemStatus::Other(other),
        }
    }
}

impl From<SystemStatus> for i32 {
    fn from(s: SystemStatus) -> Self {
        match s {
            SystemStatus::Unset => 0,
            SystemStatus::Ready => 3,
            SystemStatus::Offline => 99,
            SystemStatus::Other(v) => v,
        }
    }
}

impl core::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SystemStatus::Ready => f.write_str("ready"),
            SystemStatus::Offline => f.write_str("offline"),
            other => write!(f, "SystemStatus({})", i32::from(*other)),
        }
    }
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// `Option<Duration>` as a Go duration string.
mod go_duration_opt {
    use super::Duration;
    use crate::util::{format_go_duration, parse_go_duration};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_str(&format_go_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| parse_go_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Cleaned real-time grill status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub ambient: i32,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub grill: i32,
    #[serde(default)]
    pub grill_set: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub keep_warm: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pellet_level: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub probe: i32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub probe_alarm_fired: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub probe_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "go_duration_opt")]
    pub probe_eta: Option<Duration>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub probe_set: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub real_time: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub smoke: i32,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub system_status: SystemStatus,
}

#[derive(Debug, Deserialize)]
struct UpdateEnvelope {
    status: RawStatus,
}

/// Broker message body; unknown keys (cook timers, cycle, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatus {
    ambient: i32,
    connected: bool,
    grill: i32,
    keepwarm: i32,
    pellet_level: i32,
    probe: i32,
    probe_alarm_fired: i32,
    probe_con: i32,
    probe_set: i32,
    real_time: i32,
    set: i32,
    smoke: i32,
    system_status: i32,
    time: i64,
    units: i32,
}

impl Status {
    /// Decode a raw broker envelope.
    pub fn from_update_payload(bytes: &[u8]) -> Result<Self, GrillError> {
        let env: UpdateEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| GrillError::Telemetry(format!("bad update payload: {e}")))?;
        let raw = env.status;
        let time = DateTime::<Utc>::from_timestamp(raw.time, 0)
            .ok_or_else(|| GrillError::Telemetry(format!("timestamp out of range: {}", raw.time)))?;
        Ok(Self {
            ambient: raw.ambient,
            connected: raw.connected,
            grill: raw.grill,
            grill_set: raw.set,
            keep_warm: raw.keepwarm,
            pellet_level: raw.pellet_level,
            probe: raw.probe,
            probe_alarm_fired: raw.probe_alarm_fired != 0,
            probe_connected: raw.probe_con != 0,
            probe_eta: None,
            probe_set: raw.probe_set,
            real_time: raw.real_time,
            smoke: raw.smoke,
            time,
            units: raw.units.into(),
            system_status: raw.system_status.into(),
        })
    }

    /// Decode one line of the monitor's JSON-lines log.
    pub fn from_json_line(bytes: &[u8]) -> Result<Self, GrillError> {
        serde_json::from_slice(bytes).map_err(|e| GrillError::Telemetry(format!("bad status line: {e}")))
    }

    /// Estimator input, or `None` when the record carries no probe data.
    pub fn observation(&self) -> Option<Observation> {
        if self.probe <= 0 || self.probe_set <= 0 {
            return None;
        }
        Some(Observation::new(
            f64::from(self.probe),
            self.time,
            f64::from(self.probe_set),
            f64::from(self.grill),
            f64::from(self.grill_set),
        ))
    }
}

/// Decode either wire form: the log line first, then the broker envelope.
pub fn decode_payload(bytes: &[u8]) -> Result<Status, GrillError> {
    Status::from_json_line(bytes).or_else(|_| Status::from_update_payload(bytes))
}
