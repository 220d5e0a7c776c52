//! Jittered "predictions" and the energy projection.
//!
//! These are presentation values, not forecasts: the measured value scaled by
//! a uniform factor in `1 ± jitter_pct`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PredictionCfg;
use crate::history::{HistoryBuffer, mean_of};
use crate::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Prediction {
    pub current: f32,
    pub power: f32,
}

#[derive(Debug)]
pub struct Predictor {
    cfg: PredictionCfg,
    rng: StdRng,
}

impl Predictor {
    pub fn new(cfg: PredictionCfg) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, rng }
    }

    fn jitter(&mut self, value: f32) -> f32 {
        let pct = self.cfg.jitter_pct.abs();
        if pct == 0.0 {
            return value;
        }
        let u: f32 = self.rng.gen_range(-pct..=pct);
        value * (1.0 + u)
    }

    pub fn predict(&mut self, sample: &Sample) -> Prediction {
        Prediction {
            current: self.jitter(sample.current),
            power: self.jitter(sample.power),
        }
    }

    /// Mean power over everything buffered, extended over the horizon, in Wh.
    pub fn energy_projection_wh(&self, history: &HistoryBuffer) -> f32 {
        let hours = self.cfg.horizon_s as f32 / 3600.0;
        mean_of(history.chronological()).map_or(0.0, |m| m.power * hours)
    }

    pub fn horizon_s(&self) -> u64 {
        self.cfg.horizon_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattguard_traits::Reading;

    fn cfg(jitter_pct: f32, seed: u64) -> PredictionCfg {
        PredictionCfg {
            jitter_pct,
            horizon_s: 3600,
            seed: Some(seed),
        }
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let mut p = Predictor::new(cfg(0.02, 7));
        let s = Sample::from_reading(Reading::new(12.0, 0.5), 0);
        for _ in 0..1000 {
            let pr = p.predict(&s);
            assert!((pr.current - 0.5).abs() <= 0.5 * 0.02 + 1e-6);
            assert!((pr.power - 6.0).abs() <= 6.0 * 0.02 + 1e-5);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let s = Sample::from_reading(Reading::new(12.0, 0.5), 0);
        let mut a = Predictor::new(cfg(0.05, 42));
        let mut b = Predictor::new(cfg(0.05, 42));
        for _ in 0..10 {
            assert_eq!(a.predict(&s), b.predict(&s));
        }
    }

    #[test]
    fn zero_jitter_is_identity() {
        let mut p = Predictor::new(cfg(0.0, 1));
        let s = Sample::from_reading(Reading::new(5.0, 2.0), 0);
        assert_eq!(p.predict(&s), Prediction { current: 2.0, power: 10.0 });
    }

    #[test]
    fn energy_projection_uses_mean_power() {
        let p = Predictor::new(PredictionCfg {
            horizon_s: 1800,
            ..cfg(0.0, 1)
        });
        let mut h = HistoryBuffer::new(4);
        assert_eq!(p.energy_projection_wh(&h), 0.0);
        h.record(Sample::from_reading(Reading::new(10.0, 1.0), 0));
        h.record(Sample::from_reading(Reading::new(10.0, 3.0), 1000));
        assert!((p.energy_projection_wh(&h) - 10.0).abs() < 1e-5);
    }
}
