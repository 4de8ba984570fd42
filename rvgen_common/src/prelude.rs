//! Prelude module for common re-exports.
//!
//! ```rust
//! use rvgen_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::hal::config::{ControlSettings, GeneratorConfig};

// ─── Hardware capabilities ──────────────────────────────────────────
pub use crate::hal::driver::{
    DriverFactory, HalError, Hardware, RelayActuator, RelayLine, TemperatureSource,
    VoltageSource,
};
