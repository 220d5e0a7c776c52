//! Sensor and relay backends for the monitor.
//!
//! The simulated backends are always available and drive the CLI and tests.
//! The `hardware` feature adds an INA219 power monitor on I2C and a GPIO relay
//! via `rppal`.
pub mod error;
#[cfg(feature = "hardware")]
pub mod ina219;
pub mod util;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wattguard_traits::{Reading, Relay, SampleSource};

use crate::error::HwError;

/// Simulated voltage/current front end.
///
/// Produces a steady reading with optional uniform noise, and can switch to a
/// different current after a fixed number of reads to emulate a load change.
pub struct SimulatedSensor {
    voltage: f32,
    current: f32,
    noise_pct: f32,
    step: Option<(u64, f32)>,
    fail_probe: bool,
    reads: u64,
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new(voltage: f32, current: f32) -> Self {
        Self {
            voltage,
            current,
            noise_pct: 0.0,
            step: None,
            fail_probe: false,
            reads: 0,
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Add symmetric uniform noise of `pct` (fraction, e.g. 0.002) to both metrics.
    pub fn with_noise(mut self, pct: f32, seed: u64) -> Self {
        self.noise_pct = pct.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// After `after_reads` successful reads, report `current` instead.
    pub fn with_step(mut self, after_reads: u64, current: f32) -> Self {
        self.step = Some((after_reads, current));
        self
    }

    /// Make `probe()` fail, emulating a sensor that is absent on the bus.
    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    fn jitter(&mut self, value: f32) -> f32 {
        if self.noise_pct > 0.0 {
            let u: f32 = self.rng.gen_range(-1.0..=1.0);
            value * (1.0 + u * self.noise_pct)
        } else {
            value
        }
    }
}

impl SampleSource for SimulatedSensor {
    fn read(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        let base_current = match self.step {
            Some((after, stepped)) if self.reads >= after => stepped,
            _ => self.current,
        };
        self.reads = self.reads.saturating_add(1);
        let voltage = self.jitter(self.voltage);
        let current = self.jitter(base_current);
        tracing::trace!(voltage, current, "simulated reading");
        Ok(Reading::new(voltage, current))
    }

    fn probe(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_probe {
            return Err(Box::new(HwError::NotDetected(
                "simulated sensor configured to fail".into(),
            )));
        }
        Ok(())
    }
}

/// Feeds pre-recorded readings, then reports `HwError::ReplayExhausted`.
#[derive(Debug, Default)]
pub struct ReplaySource {
    readings: VecDeque<Reading>,
}

impl ReplaySource {
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl SampleSource for ReplaySource {
    fn read(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        self.readings
            .pop_front()
            .ok_or_else(|| Box::new(HwError::ReplayExhausted) as _)
    }

    fn probe(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.readings.is_empty() {
            return Err(Box::new(HwError::ReplayExhausted));
        }
        Ok(())
    }
}

/// Shared view of a `SimulatedRelay`'s output, kept by tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct RelayProbe {
    on: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
}

impl RelayProbe {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    /// Number of `set_output` calls seen so far.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }
}

/// Simulated relay output.
#[derive(Debug, Default)]
pub struct SimulatedRelay {
    probe: RelayProbe,
    faulty: bool,
}

impl SimulatedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A relay whose driver rejects every write.
    pub fn faulty() -> Self {
        Self {
            faulty: true,
            ..Self::default()
        }
    }

    pub fn probe(&self) -> RelayProbe {
        self.probe.clone()
    }
}

impl Relay for SimulatedRelay {
    fn set_output(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.faulty {
            return Err(Box::new(HwError::Gpio("simulated relay driver fault".into())));
        }
        self.probe.on.store(on, Ordering::Relaxed);
        self.probe.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(on, "relay output (simulated)");
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub use gpio_relay::GpioRelay;

#[cfg(feature = "hardware")]
mod gpio_relay {
    use rppal::gpio::{Gpio, OutputPin};
    use wattguard_traits::Relay;

    use crate::error::{HwError, Result};

    /// Relay coil driven from a single GPIO line.
    pub struct GpioRelay {
        pin: OutputPin,
        active_low: bool,
    }

    impl GpioRelay {
        pub fn new(pin: u8, active_low: bool) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let mut pin = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output();
            // Keep the last commanded level if the process exits.
            pin.set_reset_on_drop(false);
            Ok(Self { pin, active_low })
        }
    }

    impl Relay for GpioRelay {
        fn set_output(
            &mut self,
            on: bool,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if on != self.active_low {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            tracing::debug!(on, active_low = self.active_low, "relay output");
            Ok(())
        }
    }
}
