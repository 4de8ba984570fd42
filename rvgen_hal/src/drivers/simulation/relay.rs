//! Simulated relay board.

use rvgen_common::hal::driver::{HalError, RelayActuator, RelayLine};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::trace;

/// Two relay lines backed by atomics. Counts rising edges so the plant can
/// react to pulses it did not observe while they were held.
#[derive(Debug, Default)]
pub struct SimRelay {
    start: AtomicBool,
    stop: AtomicBool,
    start_edges: AtomicU32,
    stop_edges: AtomicU32,
    released: AtomicBool,
}

impl SimRelay {
    /// Create a relay board with every line inactive.
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, line: RelayLine) -> &AtomicBool {
        match line {
            RelayLine::Start => &self.start,
            RelayLine::Stop => &self.stop,
        }
    }

    fn edge_counter(&self, line: RelayLine) -> &AtomicU32 {
        match line {
            RelayLine::Start => &self.start_edges,
            RelayLine::Stop => &self.stop_edges,
        }
    }

    /// Number of times `line` has been asserted.
    pub fn pulse_count(&self, line: RelayLine) -> u32 {
        self.edge_counter(line).load(Ordering::SeqCst)
    }

    /// Whether [`RelayActuator::release`] has been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl RelayActuator for SimRelay {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn set_line(&self, line: RelayLine, active: bool) -> Result<(), HalError> {
        let was_active = self.flag(line).swap(active, Ordering::SeqCst);
        if active && !was_active {
            self.edge_counter(line).fetch_add(1, Ordering::SeqCst);
        }
        trace!("sim relay {line} -> {}", if active { "on" } else { "off" });
        Ok(())
    }

    fn is_active(&self, line: RelayLine) -> Result<bool, HalError> {
        Ok(self.flag(line).load(Ordering::SeqCst))
    }

    fn release(&self) -> Result<(), HalError> {
        self.force_all_inactive()?;
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn counts_rising_edges_only() {
        let relay = SimRelay::new();
        relay.set_line(RelayLine::Start, true).unwrap();
        relay.set_line(RelayLine::Start, true).unwrap();
        relay.set_line(RelayLine::Start, false).unwrap();
        relay.pulse(RelayLine::Start, Duration::ZERO, &|_| {}).unwrap();

        assert_eq!(relay.pulse_count(RelayLine::Start), 2);
        assert_eq!(relay.pulse_count(RelayLine::Stop), 0);
        assert!(!relay.is_active(RelayLine::Start).unwrap());
    }

    #[test]
    fn release_drops_every_line() {
        let relay = SimRelay::new();
        relay.set_line(RelayLine::Stop, true).unwrap();
        relay.release().unwrap();
        assert!(relay.is_released());
        assert!(!relay.is_active(RelayLine::Stop).unwrap());
    }
}
