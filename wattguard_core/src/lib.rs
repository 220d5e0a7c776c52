#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Power monitoring core (hardware-agnostic).
//!
//! Samples voltage and current through `wattguard_traits::SampleSource`, keeps
//! an adaptive baseline per metric, and latches a relay off through
//! `wattguard_traits::Relay` when a deviation persists.
//!
//! ## Architecture
//!
//! - **History**: fixed ring of recent samples and the short-window mean (`history`)
//! - **Baseline**: warm-up mean, then exponential smoothing (`baseline`)
//! - **Detection**: relative/absolute thresholds and a consecutive-run latch (`detector`)
//! - **Interlock**: commanded state plus a latched interrupt flag (`interlock`)
//! - **Commands**: line framing, parsing and dispatch (`command`, `monitor`)
//! - **Scheduling**: fixed-period loop with non-blocking input (`runner`, `input`)
//!
//! `Monitor` is the single owner of all mutable control state; build one with
//! `Monitor::builder()`.

pub mod baseline;
pub mod builder;
pub mod command;
pub mod config;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod history;
pub mod hw_error;
pub mod input;
pub mod interlock;
pub mod mocks;
pub mod monitor;
pub mod predict;
pub mod response;
pub mod runner;
pub mod sample;
pub mod telemetry;

pub use baseline::{Baseline, BaselineTracker, BaselineUpdate};
pub use builder::MonitorBuilder;
pub use command::{Command, LineAccumulator, UnknownCommand};
pub use config::{
    BaselineCfg, CommandsCfg, DetectorCfg, HistoryCfg, MetricThreshold, PredictionCfg, Timeouts,
};
pub use detector::{AnomalyDetector, Detection, DetectionState, MetricFlags, threshold};
pub use error::{BuildError, GuardError, Result};
pub use history::{HistoryBuffer, ShortWindowAverager};
pub use input::{CommandInput, CommandSource, NoInput, ScriptedInput};
pub use interlock::{RelayInterlock, RelayState, ToggleRejected};
pub use monitor::{Monitor, TickReport};
pub use predict::{Prediction, Predictor};
pub use response::{Response, ResponseKind};
pub use runner::{EndReason, RunParams, RunSummary, TelemetrySink, run};
pub use sample::{Metric, Metrics, Sample};
pub use telemetry::{CSV_HEADER, Telemetry};
