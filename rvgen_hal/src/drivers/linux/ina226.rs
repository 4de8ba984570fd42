//! INA226 bus-voltage sensor over i2c-dev.

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use rvgen_common::hal::driver::{HalError, VoltageSource};
use rvgen_common::hal::ina226::{REG_BUS_VOLTAGE, REG_CONFIG, bus_voltage_from_word, config_word};
use tracing::info;

/// INA226 in continuous bus-voltage conversion mode.
pub struct Ina226 {
    dev: LinuxI2CDevice,
    path: String,
    addr: u16,
}

impl Ina226 {
    /// Open `/dev/i2c-{bus}` at `addr` and write the configuration register.
    pub fn open(bus: u8, addr: u16) -> Result<Self, HalError> {
        let path = format!("/dev/i2c-{bus}");
        let mut dev = LinuxI2CDevice::new(&path, addr)
            .map_err(|e| HalError::InitFailed(format!("INA226 {path}@0x{addr:02x}: {e}")))?;
        dev.smbus_write_word_data(REG_CONFIG, config_word())
            .map_err(|e| HalError::InitFailed(format!("INA226 {path}@0x{addr:02x} configure: {e}")))?;

        info!("INA226 ready on {path} at 0x{addr:02x}");
        Ok(Self { dev, path, addr })
    }
}

impl VoltageSource for Ina226 {
    fn name(&self) -> &'static str {
        "ina226"
    }

    fn read_voltage(&mut self) -> Result<f64, HalError> {
        self.dev
            .smbus_read_word_data(REG_BUS_VOLTAGE)
            .map(bus_voltage_from_word)
            .map_err(|e| HalError::BusError(format!("{}@0x{:02x}: {e}", self.path, self.addr)))
    }
}
