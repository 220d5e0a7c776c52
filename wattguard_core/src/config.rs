//! Runtime configuration for the monitor.
//!
//! These are the structs `Monitor` is built from. They are separate from the
//! TOML-deserialized config in `wattguard_config`; see `conversions`.

/// Ring buffer sizing.
#[derive(Debug, Clone, Copy)]
pub struct HistoryCfg {
    /// Samples kept in the ring buffer.
    pub capacity: usize,
    /// Samples averaged for the short-window mean (`1..=capacity`).
    pub short_window: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            capacity: 40,
            short_window: 5,
        }
    }
}

/// Baseline warm-up and smoothing.
#[derive(Debug, Clone, Copy)]
pub struct BaselineCfg {
    /// Samples averaged before the baseline becomes valid.
    pub warmup_samples: u32,
    /// EMA factor applied per tick once steady. Range: (0.0, 1.0].
    pub alpha: f32,
}

impl Default for BaselineCfg {
    fn default() -> Self {
        Self {
            warmup_samples: 10,
            alpha: 0.02,
        }
    }
}

/// Relative/absolute threshold pair for one metric.
///
/// The effective threshold is `max(min_abs, |baseline| * rel_pct)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricThreshold {
    pub rel_pct: f32,
    pub min_abs: f32,
}

/// Anomaly detector tuning.
#[derive(Debug, Clone, Copy)]
pub struct DetectorCfg {
    /// Consecutive candidate ticks that trigger a latch.
    pub consecutive: u32,
    /// Whether detection starts armed.
    pub armed: bool,
    pub current: MetricThreshold,
    pub power: MetricThreshold,
    pub voltage: MetricThreshold,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            consecutive: 3,
            armed: true,
            current: MetricThreshold {
                rel_pct: 0.05,
                min_abs: 0.0003,
            },
            power: MetricThreshold {
                rel_pct: 0.06,
                min_abs: 0.0008,
            },
            voltage: MetricThreshold {
                rel_pct: 0.01,
                min_abs: 0.01,
            },
        }
    }
}

/// Jittered predictions and energy projection.
#[derive(Debug, Clone, Copy)]
pub struct PredictionCfg {
    /// Half-width of the uniform jitter, as a fraction of the measured value.
    pub jitter_pct: f32,
    /// Energy projection horizon in seconds.
    pub horizon_s: u64,
    /// Fixed seed for reproducible output; entropy-seeded when `None`.
    pub seed: Option<u64>,
}

impl Default for PredictionCfg {
    fn default() -> Self {
        Self {
            jitter_pct: 0.02,
            horizon_s: 3600,
            seed: None,
        }
    }
}

/// Command line framing.
#[derive(Debug, Clone, Copy)]
pub struct CommandsCfg {
    /// Characters kept per line; the rest is dropped until the terminator.
    pub max_line_len: usize,
}

impl Default for CommandsCfg {
    fn default() -> Self {
        Self { max_line_len: 160 }
    }
}

/// Timeouts.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Max sensor wait per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 200 }
    }
}
