//! Threshold comparison and the consecutive-run latch counter.

use crate::config::{DetectorCfg, MetricThreshold};
use crate::sample::{Metric, Metrics};

/// Effective deviation threshold for one metric.
///
/// `max(min_abs, |baseline| * rel_pct)`. The absolute floor keeps it positive
/// when the baseline is zero or non-finite.
#[inline]
pub fn threshold(baseline: f32, t: MetricThreshold) -> f32 {
    t.min_abs.max(baseline.abs() * t.rel_pct)
}

/// Whether `mean` deviates from `baseline` by more than the threshold.
#[inline]
pub fn deviates(mean: f32, baseline: f32, t: MetricThreshold) -> bool {
    (mean - baseline).abs() > threshold(baseline, t)
}

/// Which metrics exceeded their threshold on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricFlags {
    pub current: bool,
    pub power: bool,
    pub voltage: bool,
}

impl MetricFlags {
    pub fn any(&self) -> bool {
        self.current || self.power || self.voltage
    }

    pub fn get(&self, metric: Metric) -> bool {
        match metric {
            Metric::Current => self.current,
            Metric::Power => self.power,
            Metric::Voltage => self.voltage,
        }
    }

    /// Names of the metrics that fired, for logs and status lines.
    pub fn names(&self) -> Vec<&'static str> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.get(*m))
            .map(Metric::name)
            .collect()
    }
}

/// Operator-visible detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionState {
    pub consecutive_count: u32,
    pub armed: bool,
}

/// Outcome of one detector evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub fired: MetricFlags,
    /// Fired, armed, and the interlock was not already interrupted.
    pub candidate: bool,
    /// Run length after this tick (0 after a latch).
    pub consecutive: u32,
    /// The run reached the configured length; the interlock must interrupt.
    pub latched: bool,
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    cfg: DetectorCfg,
    consecutive: u32,
    armed: bool,
}

impl AnomalyDetector {
    pub fn new(cfg: DetectorCfg) -> Self {
        Self {
            armed: cfg.armed,
            cfg,
            consecutive: 0,
        }
    }

    pub fn fired(&self, mean: &Metrics, baseline: &Metrics) -> MetricFlags {
        MetricFlags {
            current: deviates(mean.current, baseline.current, self.cfg.current),
            power: deviates(mean.power, baseline.power, self.cfg.power),
            voltage: deviates(mean.voltage, baseline.voltage, self.cfg.voltage),
        }
    }

    /// Per-metric thresholds for the given baseline.
    pub fn thresholds(&self, baseline: &Metrics) -> Metrics {
        Metrics {
            current: threshold(baseline.current, self.cfg.current),
            power: threshold(baseline.power, self.cfg.power),
            voltage: threshold(baseline.voltage, self.cfg.voltage),
        }
    }

    /// Compare the short-window mean with the baseline and advance the run counter.
    ///
    /// A candidate tick extends the run; any other tick resets it to zero.
    /// Reaching `consecutive` reports a latch and resets the run.
    pub fn evaluate(&mut self, mean: &Metrics, baseline: &Metrics, interrupted: bool) -> Detection {
        let fired = self.fired(mean, baseline);
        let candidate = fired.any() && self.armed && !interrupted;

        if !candidate {
            self.consecutive = 0;
            return Detection {
                fired,
                candidate,
                consecutive: 0,
                latched: false,
            };
        }

        self.consecutive += 1;
        tracing::debug!(
            run = self.consecutive,
            needed = self.cfg.consecutive,
            metrics = ?fired.names(),
            "deviation candidate"
        );
        let latched = self.consecutive >= self.cfg.consecutive.max(1);
        if latched {
            self.consecutive = 0;
        }
        Detection {
            fired,
            candidate,
            consecutive: self.consecutive,
            latched,
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
        self.consecutive = 0;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.consecutive = 0;
    }

    /// Forget any partial run (used when the baseline is recalibrated).
    pub fn reset_run(&mut self) {
        self.consecutive = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn state(&self) -> DetectionState {
        DetectionState {
            consecutive_count: self.consecutive,
            armed: self.armed,
        }
    }

    pub fn required_run(&self) -> u32 {
        self.cfg.consecutive.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CURRENT: MetricThreshold = MetricThreshold {
        rel_pct: 0.05,
        min_abs: 0.0003,
    };

    fn base() -> Metrics {
        Metrics {
            current: 0.5,
            power: 6.0,
            voltage: 12.0,
        }
    }

    fn with_current(current: f32) -> Metrics {
        Metrics { current, ..base() }
    }

    #[test]
    fn threshold_scenario_half_amp() {
        assert!((threshold(0.5, CURRENT) - 0.025).abs() < 1e-7);
        assert!(deviates(0.530, 0.5, CURRENT));
        assert!(!deviates(0.520, 0.5, CURRENT));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.0)]
    #[case(1e-9)]
    #[case(f32::NAN)]
    fn floor_keeps_threshold_positive(#[case] baseline: f32) {
        assert!(threshold(baseline, CURRENT) >= CURRENT.min_abs);
    }

    #[test]
    fn latches_only_on_third_consecutive_candidate() {
        let mut d = AnomalyDetector::new(DetectorCfg::default());
        let spike = with_current(0.6);
        let normal = base();
        let ticks = [spike, spike, normal, spike, spike, spike];
        let latched: Vec<bool> = ticks
            .iter()
            .map(|m| d.evaluate(m, &base(), false).latched)
            .collect();
        assert_eq!(latched, vec![false, false, false, false, false, true]);
        assert_eq!(d.state().consecutive_count, 0);
    }

    #[test]
    fn interrupted_interlock_is_not_a_candidate() {
        let mut d = AnomalyDetector::new(DetectorCfg::default());
        let spike = with_current(0.6);
        d.evaluate(&spike, &base(), false);
        let det = d.evaluate(&spike, &base(), true);
        assert!(det.fired.current);
        assert!(!det.candidate);
        assert_eq!(det.consecutive, 0);
    }

    #[test]
    fn disarm_blocks_counting_and_rearm_restarts_from_zero() {
        let mut d = AnomalyDetector::new(DetectorCfg::default());
        let spike = with_current(0.6);
        d.evaluate(&spike, &base(), false);
        d.evaluate(&spike, &base(), false);
        d.disarm();
        for _ in 0..10 {
            let det = d.evaluate(&spike, &base(), false);
            assert!(!det.latched);
            assert_eq!(d.state().consecutive_count, 0);
        }
        d.arm();
        assert_eq!(d.state().consecutive_count, 0);
        assert_eq!(d.evaluate(&spike, &base(), false).consecutive, 1);
    }

    #[test]
    fn any_metric_counts() {
        let mut d = AnomalyDetector::new(DetectorCfg::default());
        let sag = Metrics {
            voltage: 11.5,
            ..base()
        };
        let det = d.evaluate(&sag, &base(), false);
        assert_eq!(det.fired.names(), vec!["voltage"]);
        assert!(det.candidate);
    }
}
