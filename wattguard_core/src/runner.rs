//! Fixed-period scheduler around `Monitor`.
//!
//! Each iteration drains command input, applies it, takes one sample, emits
//! telemetry, then sleeps one period on the monitor's clock. A sensor timeout
//! skips the tick; an exhausted source ends the run cleanly; any other error
//! aborts it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::hw_error::{is_exhausted, is_timeout};
use crate::input::CommandSource;
use crate::monitor::Monitor;
use crate::response::Response;
use crate::telemetry::Telemetry;

/// Receives everything the monitor reports.
pub trait TelemetrySink {
    fn telemetry(&mut self, t: &Telemetry) -> Result<()>;
    fn response(&mut self, r: &Response) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Pause after every tick.
    pub period: Duration,
    /// Stop after this many ticks (skipped ones included).
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    MaxTicks,
    SourceExhausted,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks that produced a sample.
    pub ticks: u64,
    /// Latch events during this run.
    pub latches: u64,
    /// Ticks skipped because the sensor timed out.
    pub skipped_reads: u64,
    pub ended: EndReason,
}

/// Drive an already-started monitor until a stop condition.
pub fn run<C, K>(
    monitor: &mut Monitor,
    input: &mut C,
    sink: &mut K,
    params: RunParams,
    shutdown: Option<&AtomicBool>,
) -> Result<RunSummary>
where
    C: CommandSource + ?Sized,
    K: TelemetrySink + ?Sized,
{
    let latches_before = monitor.latches();
    let mut iterations = 0u64;
    let mut ticks = 0u64;
    let mut skipped_reads = 0u64;

    tracing::info!(period_ms = params.period.as_millis() as u64, max_ticks = ?params.max_ticks, "run start");

    let ended = loop {
        if shutdown.is_some_and(|f| f.load(Ordering::Relaxed)) {
            break EndReason::Shutdown;
        }
        if params.max_ticks.is_some_and(|max| iterations >= max) {
            break EndReason::MaxTicks;
        }
        iterations += 1;

        let bytes = input.drain();
        let mut responses = Vec::new();
        let fed = monitor.feed_input(&bytes, &mut responses);
        for r in &responses {
            sink.response(r)?;
        }
        fed?;

        match monitor.step() {
            Ok(report) => {
                ticks += 1;
                sink.telemetry(&report.telemetry)?;
            }
            Err(e) if is_timeout(&e) => {
                skipped_reads += 1;
                tracing::warn!(error = %e, "sensor timeout; tick skipped");
            }
            Err(e) if is_exhausted(&e) => {
                tracing::info!("sample source exhausted");
                break EndReason::SourceExhausted;
            }
            Err(e) => {
                tracing::error!(error = ?e, "tick failed");
                return Err(e);
            }
        }

        monitor.clock().sleep(params.period);
    };

    let summary = RunSummary {
        ticks,
        latches: monitor.latches() - latches_before,
        skipped_reads,
        ended,
    };
    tracing::info!(?summary, "run end");
    Ok(summary)
}
