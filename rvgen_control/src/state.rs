//! Controller state and sensor snapshots.

use std::time::Instant;

/// Generator control state. Exactly one variant is active at a time and only
/// [`GeneratorController`](crate::GeneratorController) writes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerState {
    /// Generator off.
    Idle {
        /// Failed attempts in the current low-condition episode.
        consecutive_failed_attempts: u32,
        /// When the most recent attempt of the episode started.
        last_attempt_at: Option<Instant>,
        /// The "max attempts reached" event was already emitted.
        lockout_reported: bool,
        /// The next attempt needs a voltage sample taken after this instant.
        resample_after: Option<Instant>,
    },
    /// Start pulse issued; waiting out `retry_delay` for a confirmation sample.
    Starting {
        /// Voltage observed when the attempt was issued.
        attempt_start_voltage: f64,
        /// When the attempt was issued.
        attempt_started_at: Instant,
        /// Failed attempts before this one.
        prior_failed_attempts: u32,
    },
    /// Generator confirmed running.
    Running {
        /// When the run was confirmed.
        run_started_at: Instant,
    },
    /// Stop pulse in flight.
    Stopping {
        /// Start of the run being stopped, restored if the pulse fails.
        run_started_at: Instant,
    },
}

impl ControllerState {
    /// Fresh idle state with no failed attempts.
    pub const fn idle() -> Self {
        Self::Idle {
            consecutive_failed_attempts: 0,
            last_attempt_at: None,
            lockout_reported: false,
            resample_after: None,
        }
    }

    /// Failed attempts counted against the ceiling (0 outside `Idle`/`Starting`).
    pub fn failed_attempts(&self) -> u32 {
        match *self {
            Self::Idle {
                consecutive_failed_attempts,
                ..
            } => consecutive_failed_attempts,
            Self::Starting {
                prior_failed_attempts,
                ..
            } => prior_failed_attempts,
            Self::Running { .. } | Self::Stopping { .. } => 0,
        }
    }

    /// Short stable label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::Starting { .. } => "starting",
            Self::Running { .. } => "running",
            Self::Stopping { .. } => "stopping",
        }
    }

    /// `true` while the generator is believed to be running.
    pub const fn generator_running(&self) -> bool {
        matches!(self, Self::Running { .. } | Self::Stopping { .. })
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Immutable sensor snapshot, replaced wholesale on every fresh sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Battery bus voltage (V).
    pub voltage: f64,
    /// Ambient temperature (°F), if a recent one is known.
    pub temperature: Option<f64>,
    /// When `voltage` was sampled.
    pub observed_at: Instant,
    /// When `temperature` was sampled.
    pub temperature_observed_at: Option<Instant>,
}
