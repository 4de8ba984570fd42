//! Linux driver module.
//!
//! - [`Ina226`] - battery bus voltage over `/dev/i2c-N`
//! - [`SysfsRelay`] - start/stop relays on sysfs GPIO lines
//! - [`W1Thermometer`] - DS18B20 probe through the `w1_therm` sysfs file

mod ina226;
mod relay;
mod w1;

pub use ina226::Ina226;
pub use relay::SysfsRelay;
pub use w1::W1Thermometer;

use rvgen_common::hal::config::GeneratorConfig;
use rvgen_common::hal::driver::{HalError, Hardware, TemperatureSource};
use std::sync::Arc;
use tracing::{info, warn};

/// Factory function to open the Linux driver's hardware handles.
///
/// Relays are acquired first so the lines are driven inactive before any
/// other device is touched.
pub fn create_driver(config: &GeneratorConfig) -> Result<Hardware, HalError> {
    let relay = SysfsRelay::open(&config.relay)?;
    let voltage = match Ina226::open(config.sensor.i2c_bus, config.sensor.ina226_addr) {
        Ok(sensor) => sensor,
        Err(e) => {
            // Hand the lines back before reporting.
            let _ = relay.release_lines();
            return Err(e);
        }
    };

    let temperature = match (&config.sensor.w1_device, config.control.temp_enable) {
        (Some(path), true) => {
            info!("Temperature probe at {}", path.display());
            Some(Box::new(W1Thermometer::new(path.clone())) as Box<dyn TemperatureSource>)
        }
        (None, true) => {
            warn!("temp_enable set but no w1_device configured; temperature trigger inactive");
            None
        }
        (_, false) => None,
    };

    Ok(Hardware {
        driver: "linux",
        voltage: Box::new(voltage),
        temperature,
        relay: Arc::new(relay),
    })
}
