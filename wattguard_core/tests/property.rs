use proptest::prelude::*;
use wattguard_core::mocks::ScriptedSource;
use wattguard_core::{
    AnomalyDetector, DetectorCfg, MetricThreshold, Metrics, Monitor, PredictionCfg, threshold,
};
use wattguard_hardware::SimulatedRelay;
use wattguard_traits::{ManualClock, Reading};

fn base() -> Metrics {
    Metrics {
        current: 0.5,
        power: 6.0,
        voltage: 12.0,
    }
}

proptest! {
    #[test]
    fn threshold_is_positive_for_any_baseline(
        baseline in prop_oneof![Just(0.0f32), -1.0e6f32..1.0e6f32],
        rel_pct in 0.0f32..1.0,
        min_abs in 1.0e-6f32..10.0,
    ) {
        let t = threshold(baseline, MetricThreshold { rel_pct, min_abs });
        prop_assert!(t > 0.0);
        prop_assert!(t >= min_abs);
    }

    #[test]
    fn flat_signal_never_fires(
        voltage in 1.0f32..30.0,
        current in 0.0f32..5.0,
        extra_ticks in 1usize..60,
    ) {
        let n = 10 + extra_ticks;
        let mut m = Monitor::builder()
            .with_source(ScriptedSource::steady(voltage, current, n))
            .with_relay(SimulatedRelay::new())
            .with_prediction(PredictionCfg { seed: Some(3), ..PredictionCfg::default() })
            .with_clock(Box::new(ManualClock::new()))
            .build()
            .unwrap();
        m.begin().unwrap();
        for _ in 0..n {
            let r = m.step().unwrap();
            if let Some(d) = r.detection {
                prop_assert!(!d.fired.any(), "fired on flat input: {:?}", r);
            }
        }
        prop_assert_eq!(m.latches(), 0);
    }

    /// Latches happen exactly when a run of candidate ticks reaches three.
    #[test]
    fn latch_tracks_consecutive_runs(spikes in proptest::collection::vec(any::<bool>(), 1..200)) {
        let mut d = AnomalyDetector::new(DetectorCfg::default());
        let spike = Metrics { current: 0.6, ..base() };
        let mut run = 0u32;
        for s in spikes {
            let m = if s { spike } else { base() };
            let det = d.evaluate(&m, &base(), false);
            run = if s { run + 1 } else { 0 };
            let expect_latch = run == 3;
            if expect_latch {
                run = 0;
            }
            prop_assert_eq!(det.latched, expect_latch);
            prop_assert_eq!(d.state().consecutive_count, run);
        }
    }

    #[test]
    fn history_recent_is_bounded_and_newest_first(
        capacity in 1usize..64,
        n in 0usize..200,
        k in 0usize..80,
    ) {
        let mut h = wattguard_core::HistoryBuffer::new(capacity);
        for i in 0..n {
            h.record(wattguard_core::Sample::from_reading(Reading::new(1.0, 1.0), i as u64));
        }
        let got: Vec<u64> = h.recent(k).map(|s| s.timestamp_ms).collect();
        prop_assert_eq!(got.len(), k.min(n).min(capacity));
        prop_assert!(got.windows(2).all(|w| w[0] > w[1]));
        if let Some(first) = got.first() {
            prop_assert_eq!(*first, n as u64 - 1);
        }
    }
}
