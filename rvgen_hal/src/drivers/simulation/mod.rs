//! Simulation driver module.
//!
//! A software battery/generator plant for development and testing without
//! physical hardware. The relay board is shared between the runner and the
//! plant through atomics, so pulses issued by the controller start and stop
//! the simulated generator.

mod plant;
mod relay;

pub use plant::SimBattery;
pub use relay::SimRelay;

use rvgen_common::hal::config::GeneratorConfig;
use rvgen_common::hal::driver::{HalError, Hardware, TemperatureSource};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Constant ambient temperature probe.
#[derive(Debug, Clone, Copy)]
pub struct SimThermometer {
    fahrenheit: f64,
}

impl SimThermometer {
    /// Probe that always reports `fahrenheit`.
    pub fn new(fahrenheit: f64) -> Self {
        Self { fahrenheit }
    }
}

impl TemperatureSource for SimThermometer {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_temperature(&mut self) -> Option<f64> {
        Some(self.fahrenheit)
    }
}

/// Factory function to create the simulation driver's hardware handles.
pub fn create_driver(config: &GeneratorConfig) -> Result<Hardware, HalError> {
    let sim = &config.simulation;
    let relay = Arc::new(SimRelay::new());
    let voltage = SimBattery::new(sim.clone(), Arc::clone(&relay), Instant::now());
    let temperature = sim
        .ambient_temperature
        .map(|t| Box::new(SimThermometer::new(t)) as Box<dyn TemperatureSource>);

    info!(
        "Simulation plant: {:.2} V, -{}/+{} V/s, {} failed starts, x{} time",
        sim.initial_voltage, sim.discharge_rate, sim.charge_rate, sim.failed_starts, sim.time_scale
    );

    Ok(Hardware {
        driver: "simulation",
        voltage: Box::new(voltage),
        temperature,
        relay,
    })
}
