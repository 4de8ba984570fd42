//! Per-signal sampling cadence.

use std::time::{Duration, Instant};

/// Fixed-interval cadence for one signal.
///
/// A cadence is due when it has never fired or when `interval` has elapsed
/// since it last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    interval: Duration,
    last: Option<Instant>,
}

impl Cadence {
    /// New cadence that is due immediately.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Configured interval.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Instant the cadence last fired.
    pub const fn last(&self) -> Option<Instant> {
        self.last
    }

    /// Whether a fresh sample is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Record that the cadence fired at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Next instant the cadence becomes due (`None` = due now).
    pub fn next_due(&self) -> Option<Instant> {
        self.last.map(|last| last + self.interval)
    }
}

/// Which sensors the runner should read before the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleRequest {
    /// Read the bus voltage.
    pub voltage: bool,
    /// Read the temperature probe.
    pub temperature: bool,
}
