//! Driver registry for hardware drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories. Constructed at startup and handed to `GeneratorCore` by value.

use rvgen_common::hal::config::GeneratorConfig;
use rvgen_common::hal::driver::{DriverFactory, HalError, Hardware};
use std::collections::HashMap;

/// Registry of available drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Open a driver's hardware handles by name.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` if no driver with the given name is
    /// registered, otherwise whatever the driver's factory reports.
    pub fn create(&self, name: &str, config: &GeneratorConfig) -> Result<Hardware, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvgen_common::hal::driver::{RelayActuator, RelayLine, VoltageSource};
    use std::sync::Arc;

    struct FixedVoltage;

    impl VoltageSource for FixedVoltage {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn read_voltage(&mut self) -> Result<f64, HalError> {
            Ok(12.6)
        }
    }

    struct NullRelay;

    impl RelayActuator for NullRelay {
        fn name(&self) -> &'static str {
            "null"
        }

        fn set_line(&self, _line: RelayLine, _active: bool) -> Result<(), HalError> {
            Ok(())
        }

        fn is_active(&self, _line: RelayLine) -> Result<bool, HalError> {
            Ok(false)
        }
    }

    fn create_test_hardware(_config: &GeneratorConfig) -> Result<Hardware, HalError> {
        Ok(Hardware {
            driver: "test",
            voltage: Box::new(FixedVoltage),
            temperature: None,
            relay: Arc::new(NullRelay),
        })
    }

    fn failing_factory(_config: &GeneratorConfig) -> Result<Hardware, HalError> {
        Err(HalError::InitFailed("no bus".to_string()))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_driver", create_test_hardware);

        let mut hw = reg
            .create("test_driver", &GeneratorConfig::default())
            .expect("should create");
        assert_eq!(hw.driver, "test");
        assert_eq!(hw.voltage.read_voltage().unwrap(), 12.6);
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create("nonexistent", &GeneratorConfig::default());
        assert!(matches!(result, Err(HalError::DriverNotFound(_))));
    }

    #[test]
    fn registry_propagates_factory_error() {
        let mut reg = DriverRegistry::new();
        reg.register("broken", failing_factory);
        let result = reg.create("broken", &GeneratorConfig::default());
        assert!(matches!(result, Err(HalError::InitFailed(_))));
    }

    #[test]
    fn registry_list_drivers() {
        let mut reg = DriverRegistry::new();
        reg.register("beta", create_test_hardware);
        reg.register("alpha", create_test_hardware);
        assert_eq!(reg.list_drivers(), vec!["alpha", "beta"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", create_test_hardware);
        reg.register("dup", create_test_hardware);
    }
}
