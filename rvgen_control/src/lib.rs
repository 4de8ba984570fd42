//! # rvgen Control
//!
//! Generator start/stop decision logic for battery-charging generators.
//!
//! The [`GeneratorController`] is a pure state machine: the runner hands it
//! the current instant plus any fresh sensor samples, and it answers with a
//! list of [`Effect`]s (relay pulses, "all lines off", operator events). It
//! never touches hardware, which keeps every timing rule testable with
//! synthetic clocks.
//!
//! # Module Structure
//!
//! - [`config`] - Immutable `ControllerConfig` and confirmation policy
//! - [`state`] - `ControllerState` and `SensorReading`
//! - [`effect`] - `Effect` and `EventKind`
//! - [`cadence`] - Per-signal sampling cadence
//! - [`controller`] - The state machine

#![deny(missing_docs)]

pub mod cadence;
pub mod config;
pub mod controller;
pub mod effect;
pub mod state;

pub use crate::cadence::{Cadence, SampleRequest};
pub use crate::config::{ConfirmPolicy, ControllerConfig};
pub use crate::controller::GeneratorController;
pub use crate::effect::{Effect, EventKind};
pub use crate::state::{ControllerState, SensorReading};
