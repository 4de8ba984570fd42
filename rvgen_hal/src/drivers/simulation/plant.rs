//! Battery and generator plant model.
//!
//! The battery discharges linearly while the generator is off and charges
//! linearly while it runs, clamped to `[min_voltage, max_voltage]`. Relay
//! edges are consumed on every read: a start edge cranks the generator (the
//! first `failed_starts` cranks do not catch), a stop edge shuts it down.

use rvgen_common::hal::config::SimulationSettings;
use rvgen_common::hal::driver::{HalError, RelayLine, VoltageSource};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::relay::SimRelay;

/// Simulated INA226 reading the plant's battery voltage.
#[derive(Debug)]
pub struct SimBattery {
    settings: SimulationSettings,
    relay: Arc<SimRelay>,
    voltage: f64,
    generator_running: bool,
    failures_left: u32,
    seen_start_edges: u32,
    seen_stop_edges: u32,
    last_update: Instant,
}

impl SimBattery {
    /// Plant at `settings.initial_voltage` with the generator off.
    pub fn new(settings: SimulationSettings, relay: Arc<SimRelay>, now: Instant) -> Self {
        let voltage = settings
            .initial_voltage
            .clamp(settings.min_voltage, settings.max_voltage);
        let failures_left = settings.failed_starts;
        Self {
            settings,
            relay,
            voltage,
            generator_running: false,
            failures_left,
            seen_start_edges: 0,
            seen_stop_edges: 0,
            last_update: now,
        }
    }

    /// Whether the simulated generator is running.
    pub fn generator_running(&self) -> bool {
        self.generator_running
    }

    /// Advance the plant to `now` and return the battery voltage.
    pub fn sample_at(&mut self, now: Instant) -> f64 {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64()
            * self.settings.time_scale;
        self.last_update = now;

        let rate = if self.generator_running {
            self.settings.charge_rate
        } else {
            -self.settings.discharge_rate
        };
        self.voltage = (self.voltage + rate * dt).clamp(self.settings.min_voltage, self.settings.max_voltage);

        self.apply_relay_edges();
        self.voltage
    }

    fn apply_relay_edges(&mut self) {
        let starts = self.relay.pulse_count(RelayLine::Start);
        while self.seen_start_edges < starts {
            self.seen_start_edges += 1;
            if self.generator_running {
                continue;
            }
            if self.failures_left > 0 {
                self.failures_left -= 1;
                debug!("sim generator cranked but did not catch ({} failures left)", self.failures_left);
                continue;
            }
            self.generator_running = true;
            self.voltage = (self.voltage + self.settings.start_jump).min(self.settings.max_voltage);
            info!("sim generator running");
        }

        let stops = self.relay.pulse_count(RelayLine::Stop);
        if self.seen_stop_edges < stops {
            self.seen_stop_edges = stops;
            if self.generator_running {
                self.generator_running = false;
                info!("sim generator stopped");
            }
        }
    }
}

impl VoltageSource for SimBattery {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_voltage(&mut self) -> Result<f64, HalError> {
        Ok(self.sample_at(Instant::now()))
    }
}
