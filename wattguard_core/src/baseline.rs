//! Adaptive per-metric baseline.
//!
//! Two phases:
//! - **Warm-up**: sums every metric over the first `warmup_samples` samples.
//!   On the last one the sums are divided by the count and the tracker turns
//!   steady.
//! - **Steady**: `ref' = (1 - α)·ref + α·measured` per metric.
//!
//! Only `recalibrate()` returns the tracker to warm-up.

use crate::config::BaselineCfg;
use crate::sample::Metrics;

/// Snapshot of the tracker state.
///
/// While `ready` is false the refs hold partial sums, not means.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Baseline {
    pub current_ref: f32,
    pub power_ref: f32,
    pub voltage_ref: f32,
    pub ready: bool,
    pub warmup_count: u32,
}

impl Baseline {
    fn refs(&self) -> Metrics {
        Metrics {
            current: self.current_ref,
            power: self.power_ref,
            voltage: self.voltage_ref,
        }
    }

    fn set_refs(&mut self, m: Metrics) {
        self.current_ref = m.current;
        self.power_ref = m.power;
        self.voltage_ref = m.voltage;
    }
}

/// Result of feeding one sample to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineUpdate {
    /// Still collecting; no valid reference yet.
    WarmingUp { collected: u32, required: u32 },
    /// This sample completed warm-up; carries the warm-up means.
    Established(Metrics),
    /// Steady-state EMA step; carries the new references.
    Smoothed(Metrics),
}

impl BaselineUpdate {
    /// Whether a detector may compare against the baseline this tick.
    pub fn allows_detection(&self) -> bool {
        matches!(self, BaselineUpdate::Smoothed(_))
    }
}

#[derive(Debug, Clone)]
pub struct BaselineTracker {
    cfg: BaselineCfg,
    state: Baseline,
}

impl BaselineTracker {
    pub fn new(cfg: BaselineCfg) -> Self {
        Self {
            cfg,
            state: Baseline::default(),
        }
    }

    pub fn update(&mut self, measured: &Metrics) -> BaselineUpdate {
        if self.state.ready {
            let a = self.cfg.alpha;
            let next = self
                .state
                .refs()
                .zip_with(*measured, |r, x| (1.0 - a) * r + a * x);
            self.state.set_refs(next);
            return BaselineUpdate::Smoothed(next);
        }

        let sums = self.state.refs() + *measured;
        self.state.set_refs(sums);
        self.state.warmup_count += 1;

        let required = self.cfg.warmup_samples.max(1);
        if self.state.warmup_count < required {
            return BaselineUpdate::WarmingUp {
                collected: self.state.warmup_count,
                required,
            };
        }

        let n = self.state.warmup_count as f32;
        let means = sums.map(|v| v / n);
        self.state.set_refs(means);
        self.state.ready = true;
        tracing::info!(
            current = means.current,
            power = means.power,
            voltage = means.voltage,
            samples = self.state.warmup_count,
            "baseline established"
        );
        BaselineUpdate::Established(means)
    }

    /// Drop the current baseline and start a fresh warm-up.
    pub fn recalibrate(&mut self) {
        self.state = Baseline::default();
        tracing::info!(required = self.cfg.warmup_samples, "baseline recalibration started");
    }

    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    /// Valid references, or `None` during warm-up.
    pub fn references(&self) -> Option<Metrics> {
        self.state.ready.then(|| self.state.refs())
    }

    pub fn snapshot(&self) -> Baseline {
        self.state
    }

    pub fn warmup_required(&self) -> u32 {
        self.cfg.warmup_samples.max(1)
    }
}
