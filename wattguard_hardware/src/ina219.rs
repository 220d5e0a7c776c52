use std::time::Duration;

use rppal::i2c::I2c;
use tracing::trace;
use wattguard_traits::{Reading, SampleSource};

use crate::error::{HwError, Result};
use crate::util::wait_until_ready_with_timeout;

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;

/// 32 V bus range, ±320 mV shunt range, 12-bit ADCs, continuous shunt + bus.
const CONFIG_32V_320MV_CONT: u16 = 0x399F;

/// Bus voltage LSB (4 mV), applied after dropping the 3 status bits.
const BUS_LSB_V: f32 = 0.004;
/// Shunt voltage LSB (10 µV).
const SHUNT_LSB_V: f32 = 0.000_01;
/// Conversion-ready flag in the bus voltage register.
const CNVR: u16 = 0b10;
/// Math overflow flag in the bus voltage register.
const OVF: u16 = 0b01;

/// INA219 high-side current/voltage monitor on I2C.
pub struct Ina219 {
    i2c: I2c,
    shunt_ohms: f32,
}

impl Ina219 {
    pub fn new(bus: u8, address: u16, shunt_ohms: f32) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mut dev = Self { i2c, shunt_ohms };
        dev.write_reg(REG_CONFIG, CONFIG_32V_320MV_CONT)?;
        Ok(dev)
    }

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(&[reg, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Block until a fresh conversion is available, then read both channels.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<Reading> {
        let mut bus_raw = 0u16;
        wait_until_ready_with_timeout(
            || {
                bus_raw = self.read_reg(REG_BUS_VOLTAGE)?;
                Ok(bus_raw & CNVR != 0)
            },
            timeout,
            Duration::from_millis(1),
        )
        .map_err(|e| match e {
            HwError::ConversionTimeout => HwError::Timeout,
            other => other,
        })?;
        if bus_raw & OVF != 0 {
            tracing::warn!(bus_raw, "ina219 math overflow; current reading clipped");
        }
        let shunt_raw = self.read_reg(REG_SHUNT_VOLTAGE)? as i16;
        // Reading the power register clears CNVR for the next poll.
        let _ = self.read_reg(REG_POWER)?;

        let voltage = f32::from(bus_raw >> 3) * BUS_LSB_V;
        let shunt_v = f32::from(shunt_raw) * SHUNT_LSB_V;
        let current = shunt_v / self.shunt_ohms;
        trace!(bus_raw, shunt_raw, voltage, current, "ina219 read");
        Ok(Reading::new(voltage, current))
    }
}

impl SampleSource for Ina219 {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Reading, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_with_timeout(timeout)?)
    }

    fn probe(
        &mut self,
        _timeout: Duration,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let cfg = self.read_reg(REG_CONFIG)?;
        if cfg != CONFIG_32V_320MV_CONT {
            return Err(Box::new(HwError::NotDetected(format!(
                "ina219 config readback {cfg:#06x}, expected {CONFIG_32V_320MV_CONT:#06x}"
            ))));
        }
        Ok(())
    }
}
