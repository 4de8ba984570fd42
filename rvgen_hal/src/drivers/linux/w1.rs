//! DS18B20 temperature probe through the 1-Wire sysfs interface.

use rvgen_common::hal::driver::TemperatureSource;
use rvgen_common::hal::ds18b20::{celsius_to_fahrenheit, parse_w1_slave};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Reads `/sys/bus/w1/devices/28-*/w1_slave` (or any path configured).
pub struct W1Thermometer {
    path: PathBuf,
}

impl W1Thermometer {
    /// Probe backed by the given `w1_slave` file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TemperatureSource for W1Thermometer {
    fn name(&self) -> &'static str {
        "ds18b20"
    }

    fn read_temperature(&mut self) -> Option<f64> {
        let record = match fs::read_to_string(&self.path) {
            Ok(record) => record,
            Err(e) => {
                debug!("w1 read {} failed: {e}", self.path.display());
                return None;
            }
        };
        let celsius = parse_w1_slave(&record);
        if celsius.is_none() {
            debug!("w1 record from {} rejected", self.path.display());
        }
        celsius.map(celsius_to_fahrenheit)
    }
}
