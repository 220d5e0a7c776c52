//! Recorded samples and per-metric value triples.

use wattguard_traits::Reading;

/// One recorded measurement. Power is always derived from voltage and current.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
    /// Milliseconds since the monitor started.
    pub timestamp_ms: u64,
}

impl Sample {
    pub fn from_reading(reading: Reading, timestamp_ms: u64) -> Self {
        Self {
            voltage: reading.voltage,
            current: reading.current,
            power: reading.voltage * reading.current,
            timestamp_ms,
        }
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            current: self.current,
            power: self.power,
            voltage: self.voltage,
        }
    }
}

/// The three monitored quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Current,
    Power,
    Voltage,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Current, Metric::Power, Metric::Voltage];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Current => "current",
            Metric::Power => "power",
            Metric::Voltage => "voltage",
        }
    }
}

/// A value per metric (means, references, thresholds...).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub current: f32,
    pub power: f32,
    pub voltage: f32,
}

impl Metrics {
    pub const ZERO: Metrics = Metrics {
        current: 0.0,
        power: 0.0,
        voltage: 0.0,
    };

    pub fn get(&self, metric: Metric) -> f32 {
        match metric {
            Metric::Current => self.current,
            Metric::Power => self.power,
            Metric::Voltage => self.voltage,
        }
    }

    /// Apply `f` to each metric.
    pub fn map(self, mut f: impl FnMut(f32) -> f32) -> Metrics {
        Metrics {
            current: f(self.current),
            power: f(self.power),
            voltage: f(self.voltage),
        }
    }

    /// Combine two triples metric by metric.
    pub fn zip_with(self, other: Metrics, mut f: impl FnMut(f32, f32) -> f32) -> Metrics {
        Metrics {
            current: f(self.current, other.current),
            power: f(self.power, other.power),
            voltage: f(self.voltage, other.voltage),
        }
    }
}

impl std::ops::Add for Metrics {
    type Output = Metrics;
    fn add(self, rhs: Metrics) -> Metrics {
        self.zip_with(rhs, |a, b| a + b)
    }
}
