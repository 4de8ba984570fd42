//! Hardware abstraction layer types.
//!
//! Capability traits the controller runner drives (voltage sensor, optional
//! temperature probe, relay outputs), the HAL configuration loaded from
//! `rvgen.toml` plus environment overrides, INA226 register math and DS18B20
//! record parsing.

pub mod config;
pub mod driver;
pub mod ds18b20;
pub mod ina226;
