//! `From` implementations bridging `wattguard_config` types to `wattguard_core` types.

use crate::config::{
    BaselineCfg, CommandsCfg, DetectorCfg, HistoryCfg, MetricThreshold, PredictionCfg, Timeouts,
};

impl From<&wattguard_config::HistoryCfg> for HistoryCfg {
    fn from(c: &wattguard_config::HistoryCfg) -> Self {
        Self {
            capacity: c.capacity,
            short_window: c.short_window,
        }
    }
}

impl From<&wattguard_config::BaselineCfg> for BaselineCfg {
    fn from(c: &wattguard_config::BaselineCfg) -> Self {
        Self {
            warmup_samples: c.warmup_samples,
            alpha: c.alpha,
        }
    }
}

impl From<wattguard_config::MetricThreshold> for MetricThreshold {
    fn from(c: wattguard_config::MetricThreshold) -> Self {
        Self {
            rel_pct: c.rel_pct,
            min_abs: c.min_abs,
        }
    }
}

impl From<&wattguard_config::DetectorCfg> for DetectorCfg {
    fn from(c: &wattguard_config::DetectorCfg) -> Self {
        Self {
            consecutive: c.consecutive,
            armed: c.armed,
            current: c.current.into(),
            power: c.power.into(),
            voltage: c.voltage.into(),
        }
    }
}

impl From<&wattguard_config::PredictionCfg> for PredictionCfg {
    fn from(c: &wattguard_config::PredictionCfg) -> Self {
        Self {
            jitter_pct: c.jitter_pct,
            horizon_s: c.horizon_s,
            seed: c.seed,
        }
    }
}

impl From<&wattguard_config::CommandsCfg> for CommandsCfg {
    fn from(c: &wattguard_config::CommandsCfg) -> Self {
        Self {
            max_line_len: c.max_line_len,
        }
    }
}

impl From<&wattguard_config::SensorCfg> for Timeouts {
    fn from(c: &wattguard_config::SensorCfg) -> Self {
        Self {
            sensor_ms: c.read_timeout_ms,
        }
    }
}
