//! The control context: everything one tick reads or mutates, owned in one place.
//!
//! A tick is `feed_input` (apply any completed command lines) followed by
//! `step` (sample, baseline, detect, maybe latch, telemetry). Both run to
//! completion on the caller's thread, so no detector decision can observe a
//! half-updated baseline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use wattguard_traits::clock::Clock;
use wattguard_traits::{Relay, SampleSource};

use crate::baseline::{Baseline, BaselineTracker, BaselineUpdate};
use crate::builder::{Missing, MonitorBuilder};
use crate::command::{Command, LineAccumulator};
use crate::config::Timeouts;
use crate::detector::{AnomalyDetector, Detection, DetectionState};
use crate::error::{GuardError, Report, Result};
use crate::history::{HistoryBuffer, ShortWindowAverager};
use crate::hw_error::map_hw_error;
use crate::interlock::{RelayInterlock, RelayState};
use crate::predict::Predictor;
use crate::response::Response;
use crate::sample::{Metrics, Sample};
use crate::telemetry::Telemetry;

/// What one `step` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub sample: Sample,
    /// Short-window mean the detector compared (or would have compared).
    pub mean: Metrics,
    pub baseline: BaselineUpdate,
    /// `None` while the baseline is warming up.
    pub detection: Option<Detection>,
    pub telemetry: Telemetry,
}

impl TickReport {
    pub fn latched(&self) -> bool {
        self.detection.is_some_and(|d| d.latched)
    }
}

pub struct Monitor {
    pub(crate) source: Box<dyn SampleSource + Send>,
    pub(crate) relay: Box<dyn Relay + Send>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) timeouts: Timeouts,
    pub(crate) history: HistoryBuffer,
    pub(crate) averager: ShortWindowAverager,
    pub(crate) baseline: BaselineTracker,
    pub(crate) detector: AnomalyDetector,
    pub(crate) interlock: RelayInterlock,
    pub(crate) predictor: Predictor,
    pub(crate) input: LineAccumulator,
    pub(crate) replay: VecDeque<Telemetry>,
    pub(crate) last: Option<Telemetry>,
    pub(crate) ticks: u64,
    pub(crate) latches: u64,
    pub(crate) started: bool,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("interlock", &self.interlock)
            .field("detector", &self.detector.state())
            .field("baseline", &self.baseline.snapshot())
            .field("ticks", &self.ticks)
            .field("latches", &self.latches)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }

    /// Verify the sensor and drive the relay to its boot state.
    ///
    /// Sensor failure here is fatal: the caller must not start sampling.
    pub fn begin(&mut self) -> Result<()> {
        let timeout = self.sensor_timeout();
        self.source
            .probe(timeout)
            .map_err(|e| Report::new(map_hw_error(&*e)))
            .wrap_err("sensor init")?;
        self.apply_output().wrap_err("relay init")?;
        self.started = true;
        tracing::info!(
            relay = %self.interlock.output(),
            armed = self.detector.is_armed(),
            warmup = self.baseline.warmup_required(),
            "monitor started"
        );
        Ok(())
    }

    /// Feed raw command-channel bytes; each completed line pushes one response
    /// onto `out`.
    ///
    /// A relay failure stops the batch: the failing command gets a rejected
    /// response, lines after it are dropped, and the error is returned.
    pub fn feed_input(&mut self, bytes: &[u8], out: &mut Vec<Response>) -> Result<()> {
        let lines = self.input.push(bytes);
        for (i, line) in lines.iter().enumerate() {
            let cmd = match line.parse::<Command>() {
                Ok(cmd) => cmd,
                Err(e) => {
                    tracing::warn!(input = %e.input, "unknown command");
                    out.push(Response::unknown(&e));
                    continue;
                }
            };
            match self.execute(cmd) {
                Ok(r) => out.push(r),
                Err(e) => {
                    out.push(Response::rejected(cmd, format!("ERR {e:#}")));
                    let dropped = lines.len() - i - 1;
                    if dropped > 0 {
                        tracing::warn!(dropped, "command lines dropped after relay failure");
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Apply a command. Relay errors propagate; the interlock state is kept.
    pub fn execute(&mut self, cmd: Command) -> Result<Response> {
        tracing::info!(command = %cmd, "command");
        let response = match cmd {
            Command::RelayOn => {
                self.interlock.relay_on();
                self.apply_output()?;
                Response::ack(cmd, "OK relay ON")
            }
            Command::RelayOff => {
                self.interlock.relay_off();
                self.apply_output()?;
                Response::ack(cmd, "OK relay OFF")
            }
            Command::Interrupt => {
                self.interlock.interrupt();
                self.apply_output()?;
                Response::ack(cmd, "OK interrupted; relay OFF until RESUME, RELAY ON or RELAY OFF")
            }
            Command::Resume => {
                self.interlock.resume();
                self.apply_output()?;
                Response::ack(cmd, format!("OK resumed; relay {}", self.interlock.output()))
            }
            Command::Toggle => match self.interlock.toggle() {
                Ok(_) => {
                    self.apply_output()?;
                    Response::ack(cmd, format!("OK relay {}", self.interlock.output()))
                }
                Err(e) => {
                    tracing::warn!("toggle rejected while interrupted");
                    Response::rejected(cmd, format!("ERR {e}"))
                }
            },
            Command::Status => Response::info(cmd, self.status_lines()),
            Command::Calibrate => {
                self.baseline.recalibrate();
                self.detector.reset_run();
                Response::ack(
                    cmd,
                    format!(
                        "OK calibrating; baseline warm-up 0/{}",
                        self.baseline.warmup_required()
                    ),
                )
            }
            Command::Arm => {
                self.detector.arm();
                Response::ack(cmd, "OK detection armed")
            }
            Command::Disarm => {
                self.detector.disarm();
                Response::ack(cmd, "OK detection disarmed")
            }
            Command::Predict => Response::info(cmd, self.predict_lines()),
        };
        Ok(response)
    }

    /// One sampling tick: read, record, update the baseline, detect, maybe latch.
    pub fn step(&mut self) -> Result<TickReport> {
        if !self.started {
            return Err(Report::new(GuardError::State(
                "step() before begin()".into(),
            )));
        }
        let timeout = self.sensor_timeout();
        let reading = self
            .source
            .read(timeout)
            .map_err(|e| Report::new(map_hw_error(&*e)))
            .wrap_err("sensor read")?;
        if !(reading.voltage.is_finite() && reading.current.is_finite()) {
            tracing::error!(
                voltage = reading.voltage,
                current = reading.current,
                "non-finite reading rejected"
            );
            return Err(Report::new(GuardError::Hardware(format!(
                "non-finite reading: voltage={} current={}",
                reading.voltage, reading.current
            ))))
            .wrap_err("sensor read");
        }
        let sample = Sample::from_reading(reading, self.clock.ms_since(self.epoch));
        tracing::trace!(
            voltage = sample.voltage,
            current = sample.current,
            power = sample.power,
            "reading"
        );

        self.history.record(sample);
        let update = self.baseline.update(&sample.metrics());
        let mean = self.averager.mean(&self.history, &sample);

        let detection = match self.baseline.references() {
            Some(refs) if update.allows_detection() => {
                let d = self
                    .detector
                    .evaluate(&mean, &refs, self.interlock.interrupted());
                tracing::debug!(
                    fired = ?d.fired.names(),
                    run = d.consecutive,
                    candidate = d.candidate,
                    "detection"
                );
                if d.latched {
                    self.interlock.latch();
                    self.latches += 1;
                    tracing::warn!(
                        metrics = ?d.fired.names(),
                        current = mean.current,
                        power = mean.power,
                        voltage = mean.voltage,
                        "sustained deviation; relay interrupted"
                    );
                    self.apply_output().wrap_err("latch relay")?;
                }
                Some(d)
            }
            _ => None,
        };

        let telemetry = self.telemetry_for(&sample);
        self.remember(telemetry);
        self.ticks += 1;

        Ok(TickReport {
            sample,
            mean,
            baseline: update,
            detection,
            telemetry,
        })
    }

    fn telemetry_for(&mut self, sample: &Sample) -> Telemetry {
        let prediction = self.predictor.predict(sample);
        let refs = self.baseline.references().unwrap_or(Metrics::ZERO);
        Telemetry {
            timestamp: sample.timestamp_ms,
            voltage: sample.voltage,
            current: sample.current,
            power: sample.power,
            predicted_current: prediction.current,
            predicted_power: prediction.power,
            relay_state: self.interlock.output(),
            baseline_current: refs.current,
            baseline_power: refs.power,
            baseline_voltage: refs.voltage,
        }
    }

    fn remember(&mut self, t: Telemetry) {
        if self.replay.len() == self.history.capacity() {
            self.replay.pop_front();
        }
        self.replay.push_back(t);
        self.last = Some(t);
    }

    fn apply_output(&mut self) -> Result<()> {
        let state = self.interlock.output();
        self.relay
            .set_output(state.is_on())
            .map_err(|e| Report::new(GuardError::HardwareFault(e.to_string())))
            .wrap_err("relay output")?;
        tracing::info!(
            relay = %state,
            commanded_on = self.interlock.commanded_on(),
            interrupted = self.interlock.interrupted(),
            "relay output applied"
        );
        Ok(())
    }

    fn status_lines(&self) -> Vec<String> {
        let det = self.detector.state();
        let mut lines = vec![
            format!(
                "relay={} commanded={} interrupted={}",
                self.interlock.output(),
                if self.interlock.commanded_on() { "ON" } else { "OFF" },
                yes_no(self.interlock.interrupted()),
            ),
            format!(
                "detection armed={} run={}/{} latches={}",
                yes_no(det.armed),
                det.consecutive_count,
                self.detector.required_run(),
                self.latches,
            ),
        ];
        let b = self.baseline.snapshot();
        lines.push(if let Some(refs) = self.baseline.references() {
            let t = self.detector.thresholds(&refs);
            format!(
                "baseline current={:.4} power={:.4} voltage={:.3} thresholds current={:.4} power={:.4} voltage={:.3}",
                refs.current, refs.power, refs.voltage, t.current, t.power, t.voltage
            )
        } else {
            format!(
                "baseline warming {}/{}",
                b.warmup_count,
                self.baseline.warmup_required()
            )
        });
        match self.last {
            Some(t) => lines.push(t.csv_line()),
            None => lines.push("no samples yet".into()),
        }
        lines
    }

    fn predict_lines(&mut self) -> Vec<String> {
        let Some(latest) = self.history.latest().copied() else {
            return vec!["no samples yet".into()];
        };
        let p = self.predictor.predict(&latest);
        vec![
            format!("predicted current={:.4} A power={:.4} W", p.current, p.power),
            format!(
                "projected energy {:.3} Wh over {} s",
                self.predictor.energy_projection_wh(&self.history),
                self.predictor.horizon_s()
            ),
        ]
    }

    fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.sensor_ms)
    }

    pub fn relay_state(&self) -> RelayState {
        self.interlock.output()
    }

    pub fn interlock(&self) -> RelayInterlock {
        self.interlock
    }

    pub fn detection_state(&self) -> DetectionState {
        self.detector.state()
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline.snapshot()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn last_telemetry(&self) -> Option<Telemetry> {
        self.last
    }

    /// Buffered telemetry, oldest first, for a dashboard's initial replay.
    pub fn history_telemetry(&self) -> impl ExactSizeIterator<Item = &Telemetry> + '_ {
        self.replay.iter()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn latches(&self) -> u64 {
        self.latches
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}
