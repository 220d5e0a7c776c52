//! Sensor and relay selection: simulation by default, INA219 + GPIO with `--features hardware`.

use wattguard_traits::{Relay, SampleSource};

pub type Backend = (Box<dyn SampleSource + Send>, Box<dyn Relay + Send>);

#[cfg_attr(feature = "hardware", allow(dead_code))]
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|v| !v.is_empty() && v != "0")
}

/// Simulated backend tuned by `WATTGUARD_SIM_*` variables.
#[cfg_attr(feature = "hardware", allow(dead_code))]
pub fn simulated() -> Backend {
    use wattguard_hardware::{SimulatedRelay, SimulatedSensor};

    let voltage = env_parse("WATTGUARD_SIM_VOLTAGE").unwrap_or(12.0);
    let current = env_parse("WATTGUARD_SIM_CURRENT").unwrap_or(0.5);
    let mut sensor = SimulatedSensor::new(voltage, current);
    if let Some(noise) = env_parse::<f32>("WATTGUARD_SIM_NOISE") {
        sensor = sensor.with_noise(noise, 0x5eed);
    }
    if let (Some(at), Some(stepped)) = (
        env_parse::<u64>("WATTGUARD_SIM_STEP_AT"),
        env_parse::<f32>("WATTGUARD_SIM_STEP_CURRENT"),
    ) {
        sensor = sensor.with_step(at, stepped);
    }
    if env_flag("WATTGUARD_SIM_FAIL_INIT") {
        sensor = sensor.failing_probe();
    }
    let relay = if env_flag("WATTGUARD_SIM_RELAY_FAULT") {
        SimulatedRelay::faulty()
    } else {
        SimulatedRelay::new()
    };
    tracing::info!(voltage, current, "using simulated sensor and relay");
    (Box::new(sensor), Box::new(relay))
}

#[cfg(feature = "hardware")]
pub fn hardware(cfg: &wattguard_config::Config) -> eyre::Result<Backend> {
    use eyre::WrapErr;
    use wattguard_core::error::GuardError;
    use wattguard_hardware::GpioRelay;
    use wattguard_hardware::ina219::Ina219;

    let sensor = Ina219::new(
        cfg.pins.sensor_i2c_bus,
        cfg.pins.sensor_addr,
        cfg.sensor.shunt_ohms,
    )
    .map_err(|e| eyre::Report::new(GuardError::HardwareFault(e.to_string())))
    .wrap_err("sensor init")?;
    let relay = GpioRelay::new(cfg.pins.relay, cfg.pins.relay_active_low)
        .map_err(|e| eyre::Report::new(GuardError::HardwareFault(e.to_string())))
        .wrap_err("relay init")?;
    tracing::info!(
        bus = cfg.pins.sensor_i2c_bus,
        addr = cfg.pins.sensor_addr,
        relay_pin = cfg.pins.relay,
        "using INA219 sensor and GPIO relay"
    );
    Ok((Box::new(sensor), Box::new(relay)))
}

/// Pick the backend for this build.
pub fn open(cfg: &wattguard_config::Config) -> eyre::Result<Backend> {
    #[cfg(feature = "hardware")]
    {
        hardware(cfg)
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = cfg;
        Ok(simulated())
    }
}
