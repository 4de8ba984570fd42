//! Driver implementations.
//!
//! - [`simulation`] - Software battery/generator plant for development and testing
//! - `linux` - INA226, sysfs GPIO relays and DS18B20 (cargo feature `hardware`)
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Provide a `DriverFactory` returning `Hardware`
//! 3. Register it in [`register_all_drivers`]

#[cfg(feature = "hardware")]
pub mod linux;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);

    #[cfg(feature = "hardware")]
    registry.register("linux", linux::create_driver);
}

/// Driver used when none is named on the command line.
pub const fn default_driver() -> &'static str {
    if cfg!(feature = "hardware") {
        "linux"
    } else {
        "simulation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_driver_is_registered() {
        let mut registry = DriverRegistry::new();
        register_all_drivers(&mut registry);
        assert!(registry.get_factory(default_driver()).is_some());
        assert!(registry.list_drivers().contains(&"simulation"));
    }
}
