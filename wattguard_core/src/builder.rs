//! Type-state builder for `Monitor`.
//!
//! `build()` exists only once a sample source and a relay are set;
//! `try_build()` is always available and reports what is missing.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use wattguard_traits::clock::{Clock, MonotonicClock};
use wattguard_traits::{Relay, SampleSource};

use crate::baseline::BaselineTracker;
use crate::command::LineAccumulator;
use crate::config::*;
use crate::detector::AnomalyDetector;
use crate::error::{BuildError, Report, Result};
use crate::history::{HistoryBuffer, ShortWindowAverager};
use crate::interlock::RelayInterlock;
use crate::monitor::Monitor;
use crate::predict::Predictor;

pub struct Missing;
pub struct Set;

pub struct MonitorBuilder<S, R> {
    source: Option<Box<dyn SampleSource + Send>>,
    relay: Option<Box<dyn Relay + Send>>,
    history: Option<HistoryCfg>,
    baseline: Option<BaselineCfg>,
    detector: Option<DetectorCfg>,
    prediction: Option<PredictionCfg>,
    timeouts: Option<Timeouts>,
    commands: Option<CommandsCfg>,
    default_on: Option<bool>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _r: PhantomData<R>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            relay: None,
            history: None,
            baseline: None,
            detector: None,
            prediction: None,
            timeouts: None,
            commands: None,
            default_on: None,
            clock: None,
            _s: PhantomData,
            _r: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> Report {
    Report::new(BuildError::InvalidConfig(msg))
}

fn check_threshold(t: &MetricThreshold) -> Result<()> {
    if !(t.min_abs.is_finite() && t.min_abs > 0.0) {
        return Err(invalid("threshold min_abs must be > 0"));
    }
    if !(t.rel_pct.is_finite() && t.rel_pct >= 0.0) {
        return Err(invalid("threshold rel_pct must be >= 0"));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn validate_and_build(
    source: Box<dyn SampleSource + Send>,
    relay: Box<dyn Relay + Send>,
    history: HistoryCfg,
    baseline: BaselineCfg,
    detector: DetectorCfg,
    prediction: PredictionCfg,
    timeouts: Timeouts,
    commands: CommandsCfg,
    default_on: bool,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Monitor> {
    if history.capacity == 0 {
        return Err(invalid("history capacity must be >= 1"));
    }
    if history.short_window == 0 || history.short_window > history.capacity {
        return Err(invalid("short window must be in 1..=capacity"));
    }
    if baseline.warmup_samples == 0 {
        return Err(invalid("warmup_samples must be >= 1"));
    }
    if !(baseline.alpha > 0.0 && baseline.alpha <= 1.0) {
        return Err(invalid("alpha must be in (0, 1]"));
    }
    if detector.consecutive == 0 {
        return Err(invalid("consecutive must be >= 1"));
    }
    check_threshold(&detector.current)?;
    check_threshold(&detector.power)?;
    check_threshold(&detector.voltage)?;
    if timeouts.sensor_ms == 0 {
        return Err(invalid("sensor_ms must be >= 1"));
    }
    if commands.max_line_len == 0 {
        return Err(invalid("max_line_len must be >= 1"));
    }
    if !(0.0..=1.0).contains(&prediction.jitter_pct) {
        return Err(invalid("jitter_pct must be in [0, 1]"));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    Ok(Monitor {
        source,
        relay,
        clock,
        epoch,
        timeouts,
        history: HistoryBuffer::new(history.capacity),
        averager: ShortWindowAverager::new(history.short_window),
        baseline: BaselineTracker::new(baseline),
        detector: AnomalyDetector::new(detector),
        interlock: RelayInterlock::new(default_on),
        predictor: Predictor::new(prediction),
        input: LineAccumulator::new(commands.max_line_len),
        replay: VecDeque::with_capacity(history.capacity),
        last: None,
        ticks: 0,
        latches: 0,
        started: false,
    })
}

impl<S, R> MonitorBuilder<S, R> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Monitor> {
        let source = self
            .source
            .ok_or_else(|| Report::new(BuildError::MissingSource))?;
        let relay = self
            .relay
            .ok_or_else(|| Report::new(BuildError::MissingRelay))?;
        validate_and_build(
            source,
            relay,
            self.history.unwrap_or_default(),
            self.baseline.unwrap_or_default(),
            self.detector.unwrap_or_default(),
            self.prediction.unwrap_or_default(),
            self.timeouts.unwrap_or_default(),
            self.commands.unwrap_or_default(),
            self.default_on.unwrap_or(true),
            self.clock,
        )
    }

    pub fn with_history(mut self, history: HistoryCfg) -> Self {
        self.history = Some(history);
        self
    }
    pub fn with_baseline(mut self, baseline: BaselineCfg) -> Self {
        self.baseline = Some(baseline);
        self
    }
    pub fn with_detector(mut self, detector: DetectorCfg) -> Self {
        self.detector = Some(detector);
        self
    }
    pub fn with_prediction(mut self, prediction: PredictionCfg) -> Self {
        self.prediction = Some(prediction);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    pub fn with_commands(mut self, commands: CommandsCfg) -> Self {
        self.commands = Some(commands);
        self
    }
    /// Relay commanded state at boot (default ON).
    pub fn with_default_on(mut self, on: bool) -> Self {
        self.default_on = Some(on);
        self
    }
    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<R> MonitorBuilder<Missing, R> {
    pub fn with_source(
        self,
        source: impl SampleSource + Send + 'static,
    ) -> MonitorBuilder<Set, R> {
        MonitorBuilder {
            source: Some(Box::new(source)),
            relay: self.relay,
            history: self.history,
            baseline: self.baseline,
            detector: self.detector,
            prediction: self.prediction,
            timeouts: self.timeouts,
            commands: self.commands,
            default_on: self.default_on,
            clock: self.clock,
            _s: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<S> MonitorBuilder<S, Missing> {
    pub fn with_relay(self, relay: impl Relay + Send + 'static) -> MonitorBuilder<S, Set> {
        MonitorBuilder {
            source: self.source,
            relay: Some(Box::new(relay)),
            history: self.history,
            baseline: self.baseline,
            detector: self.detector,
            prediction: self.prediction,
            timeouts: self.timeouts,
            commands: self.commands,
            default_on: self.default_on,
            clock: self.clock,
            _s: PhantomData,
            _r: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Validate and build. Only available once source and relay are set.
    pub fn build(self) -> Result<Monitor> {
        self.try_build()
    }
}
