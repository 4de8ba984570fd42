//! Side effects requested by the controller.
//!
//! The controller performs no I/O. Each tick returns a list of effects that
//! the runner executes against the relay and the event sink, in order.

use std::fmt;
use std::time::Duration;

use rvgen_common::hal::driver::RelayLine;

/// Classification of operator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A start pulse is being issued.
    StartAttempt,
    /// The generator was confirmed running after a start attempt.
    StartConfirmed,
    /// A start attempt was judged unsuccessful.
    StartFailed,
    /// Start attempts are exhausted for the current low-condition episode.
    MaxAttemptsReached,
    /// The failed-attempt counter was re-armed by elapsed time.
    AttemptsReset,
    /// A stop pulse is being issued.
    Stopping,
    /// The stop pulse completed.
    Stopped,
    /// A relay line could not be driven.
    ActuatorFault,
}

impl EventKind {
    /// Whether the event warrants an operator notification.
    pub const fn is_alert(self) -> bool {
        matches!(
            self,
            Self::StartFailed | Self::MaxAttemptsReached | Self::ActuatorFault
        )
    }

    /// Short stable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartAttempt => "start_attempt",
            Self::StartConfirmed => "start_confirmed",
            Self::StartFailed => "start_failed",
            Self::MaxAttemptsReached => "max_attempts_reached",
            Self::AttemptsReset => "attempts_reset",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ActuatorFault => "actuator_fault",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One action for the runner to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Assert `line` for `duration`, then de-assert. The runner must report
    /// the outcome through
    /// [`GeneratorController::pulse_finished`](crate::GeneratorController::pulse_finished).
    PulseRelay {
        /// Line to pulse.
        line: RelayLine,
        /// Hold time.
        duration: Duration,
    },
    /// Drive every relay line inactive immediately.
    SetAllInactive,
    /// Record an operator event.
    Emit {
        /// Event class.
        kind: EventKind,
        /// Human-readable message.
        message: String,
    },
}

impl Effect {
    pub(crate) fn emit(kind: EventKind, message: impl Into<String>) -> Self {
        Self::Emit {
            kind,
            message: message.into(),
        }
    }

    /// Event kind, if this is an `Emit`.
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            Self::Emit { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
