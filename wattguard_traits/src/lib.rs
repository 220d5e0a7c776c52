pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One instantaneous measurement from the sensing front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Bus voltage in volts.
    pub voltage: f32,
    /// Load current in amperes.
    pub current: f32,
}

impl Reading {
    pub const fn new(voltage: f32, current: f32) -> Self {
        Self { voltage, current }
    }
}

pub trait SampleSource {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>>;

    /// Verify the sensor answers before the monitor starts sampling.
    ///
    /// The default performs one throwaway read.
    fn probe(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.read(timeout).map(|_| ())
    }
}

pub trait Relay {
    /// Drive the physical output. `true` energizes the load.
    fn set_output(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }

    fn probe(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).probe(timeout)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn set_output(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_output(on)
    }
}
