//! Minimal effect executor with a synthetic clock.

use std::time::{Duration, Instant};

use rvgen_common::hal::driver::RelayLine;
use rvgen_control::{ControllerConfig, Effect, EventKind, GeneratorController};

pub fn scenario_config() -> ControllerConfig {
    ControllerConfig {
        voltage_start: 12.3,
        voltage_stop: 13.6,
        voltage_rise_confirm: 0.3,
        detect_margin: 0.5,
        start_pulse_duration: Duration::from_secs(2),
        stop_pulse_duration: Duration::from_secs(2),
        min_run_time: Duration::from_secs(1800),
        retry_delay: Duration::from_secs(60),
        max_start_attempts: 3,
        attempt_reset_after: None,
        voltage_sample_interval: Duration::from_secs(5),
        temperature_sample_interval: Duration::from_secs(60),
        temperature_start_below: None,
    }
}

pub struct Harness {
    pub ctl: GeneratorController,
    pub t0: Instant,
    pub pulses: Vec<RelayLine>,
    pub events: Vec<(EventKind, String)>,
}

impl Harness {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            ctl: GeneratorController::new(config),
            t0: Instant::now(),
            pulses: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn at(&self, secs: u64) -> Instant {
        self.t0 + Duration::from_secs(secs)
    }

    /// Tick at `t0 + secs`, acknowledge every pulse as successful and return
    /// the effects the tick produced (pulse acknowledgements excluded).
    pub fn tick(&mut self, secs: u64, voltage: Option<f64>) -> Vec<Effect> {
        self.tick_with(secs, voltage, None)
    }

    pub fn tick_with(
        &mut self,
        secs: u64,
        voltage: Option<f64>,
        temperature: Option<f64>,
    ) -> Vec<Effect> {
        let now = self.at(secs);
        let effects = self.ctl.tick(now, voltage, temperature);
        for effect in &effects {
            self.record(effect);
            if let Effect::PulseRelay { line, .. } = effect {
                self.pulses.push(*line);
                for follow_up in self.ctl.pulse_finished(*line, Ok(()), now) {
                    self.record(&follow_up);
                }
            }
        }
        effects
    }

    fn record(&mut self, effect: &Effect) {
        if let Effect::Emit { kind, message } = effect {
            self.events.push((*kind, message.clone()));
        }
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn start_pulses(&self) -> usize {
        self.pulses.iter().filter(|l| **l == RelayLine::Start).count()
    }

    pub fn stop_pulses(&self) -> usize {
        self.pulses.iter().filter(|l| **l == RelayLine::Stop).count()
    }
}

pub fn has_pulse(effects: &[Effect], line: RelayLine) -> bool {
    effects
        .iter()
        .any(|e| matches!(e, Effect::PulseRelay { line: l, .. } if *l == line))
}
