//! # rvgen HAL Library
//!
//! Runner, drivers and operator-facing output for the generator controller.
//!
//! # Module Structure
//!
//! - [`core`] - GeneratorCore struct, sampling/tick/effect loop
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`event_log`] - Timestamped operator event log
//! - [`notify`] - Alert delivery
//! - [`shutdown`] - Cancellation signal
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        rvgen_hal (single crate)                   │
//! │  ┌──────────────┐   ┌────────────────┐   ┌─────────────────────┐  │
//! │  │ EventLog /   │◄──│ GeneratorCore  │◄──│  Driver Registry    │  │
//! │  │ Notifier     │   │ (runner loop)  │   │                     │  │
//! │  └──────────────┘   └───────┬────────┘   └─────────────────────┘  │
//! │                             │ tick / effects                      │
//! │                             ▼                                     │
//! │                  ┌─────────────────────┐                          │
//! │                  │ GeneratorController │ (rvgen_control)          │
//! │                  └─────────────────────┘                          │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod event_log;
pub mod notify;
pub mod shutdown;

// Re-export key types for convenience
pub use crate::core::{GeneratorCore, LoopStats};
pub use crate::driver_registry::DriverRegistry;
pub use crate::event_log::{EventLog, EventSink};
pub use crate::notify::{Notifier, NotifyError};
pub use crate::shutdown::ShutdownSignal;
