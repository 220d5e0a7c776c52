//! Per-tick status record, in CSV and structured form.

use serde::Serialize;

use crate::interlock::RelayState;

/// Column order of [`Telemetry::csv_line`].
pub const CSV_HEADER: &str = "timestamp,voltage,current,power,predicted_current,predicted_power,relay_state,baseline_current,baseline_power,baseline_voltage";

/// One status record. Baseline fields read 0.0 until warm-up completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    /// Milliseconds since the monitor started.
    pub timestamp: u64,
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
    pub predicted_current: f32,
    pub predicted_power: f32,
    pub relay_state: RelayState,
    pub baseline_current: f32,
    pub baseline_power: f32,
    pub baseline_voltage: f32,
}

impl Telemetry {
    pub fn csv_line(&self) -> String {
        format!(
            "{},{:.3},{:.4},{:.4},{:.4},{:.4},{},{:.4},{:.4},{:.3}",
            self.timestamp,
            self.voltage,
            self.current,
            self.power,
            self.predicted_current,
            self.predicted_power,
            self.relay_state,
            self.baseline_current,
            self.baseline_power,
            self.baseline_voltage,
        )
    }
}
