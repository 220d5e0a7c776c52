//! Monitor assembly from config, stdout sinks, and the subcommand bodies.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use serde_json::{Value, json};
use wattguard_core::error::{GuardError, Report, Result as CoreResult};
use wattguard_core::{
    CSV_HEADER, CommandSource, Monitor, Response, RunParams, RunSummary, Telemetry, TelemetrySink,
};
use wattguard_traits::Clock;

use crate::backend::Backend;

/// Writes telemetry and responses to stdout, as CSV/plain text or JSON lines.
pub struct StdoutSink {
    json: bool,
    header_done: bool,
}

fn io_err(e: std::io::Error) -> Report {
    Report::new(GuardError::Io(e.to_string()))
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            header_done: false,
        }
    }

    fn line(&self, s: &str) -> CoreResult<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{s}").map_err(io_err)?;
        out.flush().map_err(io_err)
    }

    fn tagged(kind: &str, value: serde_json::Result<Value>) -> CoreResult<Value> {
        let mut v = value.map_err(|e| eyre::eyre!(e))?;
        if let Value::Object(map) = &mut v {
            map.insert("type".into(), Value::String(kind.into()));
        }
        Ok(v)
    }

    /// Buffered history, oldest first.
    pub fn history<'a>(&mut self, records: impl Iterator<Item = &'a Telemetry>) -> CoreResult<()> {
        if self.json {
            let records: Vec<&Telemetry> = records.collect();
            return self.line(&json!({ "type": "history", "records": records }).to_string());
        }
        self.line("# history")?;
        self.line(CSV_HEADER)?;
        for t in records {
            self.line(&t.csv_line())?;
        }
        Ok(())
    }

    pub fn summary(&mut self, s: &RunSummary) -> CoreResult<()> {
        if self.json {
            return self.line(
                &json!({
                    "type": "summary",
                    "ticks": s.ticks,
                    "latches": s.latches,
                    "skipped_reads": s.skipped_reads,
                    "ended": format!("{:?}", s.ended),
                })
                .to_string(),
            );
        }
        self.line(&format!(
            "# done: ticks={} latches={} skipped_reads={} ended={:?}",
            s.ticks, s.latches, s.skipped_reads, s.ended
        ))
    }
}

impl TelemetrySink for StdoutSink {
    fn telemetry(&mut self, t: &Telemetry) -> CoreResult<()> {
        if self.json {
            return self.line(&Self::tagged("sample", serde_json::to_value(t))?.to_string());
        }
        if !self.header_done {
            self.line(CSV_HEADER)?;
            self.header_done = true;
        }
        self.line(&t.csv_line())
    }

    fn response(&mut self, r: &Response) -> CoreResult<()> {
        if self.json {
            return self.line(&Self::tagged("response", serde_json::to_value(r))?.to_string());
        }
        self.line(&r.to_string())
    }
}

/// Build and start a monitor from the validated config.
pub fn build_monitor(
    cfg: &wattguard_config::Config,
    backend: Backend,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> CoreResult<Monitor> {
    let (source, relay) = backend;
    let mut builder = Monitor::builder()
        .with_source(source)
        .with_relay(relay)
        .with_history((&cfg.history).into())
        .with_baseline((&cfg.baseline).into())
        .with_detector((&cfg.detector).into())
        .with_prediction((&cfg.prediction).into())
        .with_timeouts((&cfg.sensor).into())
        .with_commands((&cfg.commands).into())
        .with_default_on(cfg.relay.default_on);
    if let Some(c) = clock {
        builder = builder.with_clock(c);
    }
    let mut monitor = builder.build()?;
    monitor.begin()?;
    Ok(monitor)
}

pub struct LoopOpts {
    pub period: Duration,
    pub max_ticks: Option<u64>,
    pub replay_history: bool,
}

/// Run the tick loop, then print the summary (and history when asked).
pub fn run_loop(
    monitor: &mut Monitor,
    input: &mut dyn CommandSource,
    json: bool,
    opts: LoopOpts,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let mut sink = StdoutSink::new(json);
    let params = RunParams {
        period: opts.period,
        max_ticks: opts.max_ticks,
    };
    let summary = wattguard_core::run(monitor, input, &mut sink, params, Some(&shutdown))
        .wrap_err("monitor loop")?;
    if opts.replay_history {
        sink.history(monitor.history_telemetry())?;
    }
    sink.summary(&summary)?;
    Ok(summary)
}

/// One probe plus one reading; prints what was measured.
pub fn self_check(cfg: &wattguard_config::Config, backend: Backend, json: bool) -> CoreResult<()> {
    let mut monitor = build_monitor(cfg, backend, None)?;
    let report = monitor.step().wrap_err("self-check read")?;
    let s = report.sample;
    if json {
        println!(
            "{}",
            json!({
                "type": "self_check",
                "ok": true,
                "voltage": s.voltage,
                "current": s.current,
                "power": s.power,
                "relay_state": monitor.relay_state(),
            })
        );
    } else {
        println!(
            "self-check OK: voltage={:.3} V current={:.4} A power={:.4} W relay={}",
            s.voltage,
            s.current,
            s.power,
            monitor.relay_state()
        );
    }
    Ok(())
}
