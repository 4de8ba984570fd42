//! HAL capability traits and error types.
//!
//! This module defines:
//! - `VoltageSource` / `TemperatureSource` - sensor capabilities
//! - `RelayActuator` - discrete relay outputs with a blocking timed pulse
//! - `Hardware` - the bundle a driver factory hands to the runner
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::config::GeneratorConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sensor bus read/write failure
    #[error("Sensor bus error: {0}")]
    BusError(String),

    /// Failure to set or query a relay line
    #[error("Relay line '{line}' failed: {reason}")]
    ActuatorError {
        /// Line that failed
        line: RelayLine,
        /// Driver-provided detail
        reason: String,
    },

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Named relay output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayLine {
    /// Momentary "start" contact on the generator remote panel.
    Start,
    /// Momentary "stop" contact on the generator remote panel.
    Stop,
}

impl RelayLine {
    /// Every line, in a fixed order.
    pub const ALL: [RelayLine; 2] = [RelayLine::Start, RelayLine::Stop];

    /// Lowercase line name used in logs and configuration.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for RelayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Battery bus-voltage sensor.
pub trait VoltageSource: Send {
    /// Returns the driver's identifier (e.g. "ina226", "simulation").
    fn name(&self) -> &'static str;

    /// Read the latest bus voltage in volts.
    ///
    /// # Errors
    /// `HalError::BusError` when the bus transaction fails. The runner treats
    /// this as "no fresh sample" and keeps the previous reading.
    fn read_voltage(&mut self) -> Result<f64, HalError>;
}

/// Optional ambient temperature probe.
///
/// Unavailability is a value, not an error: the controller only ever uses
/// temperature as an additional start trigger.
pub trait TemperatureSource: Send {
    /// Returns the driver's identifier.
    fn name(&self) -> &'static str;

    /// Latest ambient temperature in °F, or `None` if the probe is absent or
    /// the read failed.
    fn read_temperature(&mut self) -> Option<f64>;
}

/// Relay output lines, active-high, inactive on acquisition and release.
///
/// All methods take `&self` and must not block on a lock the pulse holder
/// could own: the termination handler calls [`force_all_inactive`] from
/// another thread while the main loop may be in the middle of [`pulse`].
///
/// [`force_all_inactive`]: RelayActuator::force_all_inactive
/// [`pulse`]: RelayActuator::pulse
pub trait RelayActuator: Send + Sync {
    /// Returns the driver's identifier.
    fn name(&self) -> &'static str;

    /// Drive a single line.
    fn set_line(&self, line: RelayLine, active: bool) -> Result<(), HalError>;

    /// Current output level of a line.
    fn is_active(&self, line: RelayLine) -> Result<bool, HalError>;

    /// Drive every line inactive. Attempts all lines even if one fails and
    /// returns the first error.
    fn force_all_inactive(&self) -> Result<(), HalError> {
        let mut first_err = None;
        for line in RelayLine::ALL {
            if let Err(e) = self.set_line(line, false) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Assert `line`, hold it for `hold` using `wait`, then de-assert.
    ///
    /// `wait` may return early (cancellation); the line is de-asserted either
    /// way. On a failed de-assert every line is forced inactive before the
    /// error is returned.
    fn pulse(
        &self,
        line: RelayLine,
        hold: Duration,
        wait: &dyn Fn(Duration),
    ) -> Result<(), HalError> {
        if let Err(e) = self.set_line(line, true) {
            let _ = self.set_line(line, false);
            return Err(e);
        }
        wait(hold);
        if let Err(e) = self.set_line(line, false) {
            let _ = self.force_all_inactive();
            return Err(e);
        }
        Ok(())
    }

    /// Drive all lines inactive and give the lines back to the system.
    fn release(&self) -> Result<(), HalError> {
        self.force_all_inactive()
    }
}

/// Hardware handles produced by a driver factory.
///
/// The runner owns the sensors exclusively; the relay is shared with the
/// termination handler.
pub struct Hardware {
    /// Driver that produced these handles.
    pub driver: &'static str,
    /// Bus-voltage sensor.
    pub voltage: Box<dyn VoltageSource>,
    /// Optional temperature probe.
    pub temperature: Option<Box<dyn TemperatureSource>>,
    /// Relay outputs.
    pub relay: Arc<dyn RelayActuator>,
}

impl fmt::Debug for Hardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hardware")
            .field("driver", &self.driver)
            .field("voltage", &self.voltage.name())
            .field("temperature", &self.temperature.as_ref().map(|t| t.name()))
            .field("relay", &self.relay.name())
            .finish()
    }
}

/// Factory function type for creating a driver's hardware handles.
pub type DriverFactory = fn(&GeneratorConfig) -> Result<Hardware, HalError>;
