//! Test and helper doubles for wattguard_core

use std::collections::VecDeque;

use wattguard_traits::{Reading, SampleSource};

use crate::error::Result;
use crate::response::Response;
use crate::runner::TelemetrySink;
use crate::telemetry::Telemetry;

/// Sink that keeps everything it is given.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub telemetry: Vec<Telemetry>,
    pub responses: Vec<Response>,
}

impl TelemetrySink for RecordingSink {
    fn telemetry(&mut self, t: &Telemetry) -> Result<()> {
        self.telemetry.push(*t);
        Ok(())
    }

    fn response(&mut self, r: &Response) -> Result<()> {
        self.responses.push(r.clone());
        Ok(())
    }
}

/// Plays a fixed script; `None` entries time out. Reports exhaustion at the end.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Option<Reading>>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<Reading>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// `n` identical readings.
    pub fn steady(voltage: f32, current: f32, n: usize) -> Self {
        Self::new(std::iter::repeat_n(Some(Reading::new(voltage, current)), n))
    }
}

impl SampleSource for ScriptedSource {
    fn read(
        &mut self,
        _timeout: std::time::Duration,
    ) -> std::result::Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        match self.script.pop_front() {
            Some(Some(r)) => Ok(r),
            Some(None) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "scripted read timeout",
            ))),
            None => Err(Box::new(std::io::Error::other("script exhausted"))),
        }
    }

    fn probe(
        &mut self,
        _timeout: std::time::Duration,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
