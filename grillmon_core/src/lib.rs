#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Probe completion-time estimation for a networked pellet grill.
//!
//! All clock access goes through `grillmon_traits::Clock` and all telemetry
//! through `grillmon_traits::TelemetrySource`, so every component runs the
//! same way live, in replay and under test.
//!
//! ## Architecture
//!
//! - **History**: bounded FIFO of recent observations (`history`)
//! - **Exponential model**: Newton-cooling style curve with a grid-fit time constant (`exponential`)
//! - **Linear fallback**: multi-factor rate heuristic (`fallback`)
//! - **Blender**: per-session estimator selecting between the two (`blender`)
//! - **Telemetry**: status records and wire decoding (`telemetry`)
//! - **Replay**: forecast scoring against a known finish time (`replay`)
//! - **Monitor**: background sampler, processing loop and observers

pub mod blender;
pub mod config;
pub mod conversions;
pub mod error;
pub mod exponential;
pub mod fallback;
pub mod history;
pub mod monitor;
pub mod observer;
pub mod replay;
pub mod sampler;
pub mod telemetry;
pub mod types;
pub mod util;

pub use blender::{BlendedEta, EtaEstimator, EtaEstimatorBuilder, EtaSource};
pub use config::{EstimatorCfg, FallbackCfg, MonitorCfg};
pub use error::{BuildError, GrillError, Result};
pub use exponential::{ExponentialModel, ModelState, effective_equilibrium};
pub use fallback::LinearFallback;
pub use history::SampleHistory;
pub use monitor::{Monitor, MonitorReport};
pub use observer::{JsonLinesObserver, NullObserver, StatusObserver};
pub use sampler::{Sampler, SamplerEvent};
pub use telemetry::{Status, SystemStatus, Units, decode_payload};
pub use types::Observation;
