//! Generator start/stop state machine.
//!
//! ```text
//!            low voltage / low temp, attempts < max
//!   ┌──────┐ ───────────────────────────────────────► ┌──────────┐
//!   │ Idle │                                           │ Starting │
//!   └──────┘ ◄─────────────── rejected ─────────────── └──────────┘
//!      ▲                                                    │ confirmed
//!      │ pulse ok  ┌──────────┐  min run + V >= stop  ┌─────▼───┐
//!      └────────── │ Stopping │ ◄──────────────────── │ Running │
//!                  └──────────┘ ── pulse failed ────► └─────────┘
//! ```
//!
//! `tick` is purely reactive: it folds an optional fresh sample into the last
//! reading, evaluates one transition and returns the effects. Pulse outcomes
//! come back through [`GeneratorController::pulse_finished`].

use std::time::{Duration, Instant};

use rvgen_common::hal::driver::{HalError, RelayLine};

use crate::cadence::{Cadence, SampleRequest};
use crate::config::{ConfirmPolicy, ControllerConfig};
use crate::effect::{Effect, EventKind};
use crate::state::{ControllerState, SensorReading};

/// Tolerance for the confirmation rise comparison (V).
const CONFIRM_EPSILON: f64 = 1e-6;

/// Why a start is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartReason {
    LowVoltage,
    LowTemperature,
}

/// Generator controller. Owns the state machine and the sampling cadences.
#[derive(Debug, Clone)]
pub struct GeneratorController {
    config: ControllerConfig,
    state: ControllerState,
    reading: Option<SensorReading>,
    voltage_cadence: Cadence,
    temperature_cadence: Cadence,
}

impl GeneratorController {
    /// Create a controller in `Idle` with no reading.
    pub fn new(config: ControllerConfig) -> Self {
        let voltage_cadence = Cadence::new(config.voltage_sample_interval);
        let temperature_cadence = Cadence::new(config.temperature_sample_interval);
        Self {
            config,
            state: ControllerState::idle(),
            reading: None,
            voltage_cadence,
            temperature_cadence,
        }
    }

    /// Configuration in force.
    #[inline]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Last known sensor reading.
    #[inline]
    pub fn reading(&self) -> Option<SensorReading> {
        self.reading
    }

    /// Whether the low-temperature trigger is configured.
    pub fn temperature_enabled(&self) -> bool {
        self.config.temperature_start_below.is_some()
    }

    // ─── Sampling cadence ───────────────────────────────────────────

    /// Decide which sensors to read at `now` and mark their cadences.
    ///
    /// Marking happens on request, not on success, so a failing sensor is
    /// retried on its next cadence instead of every loop pass.
    pub fn sample_request(&mut self, now: Instant) -> SampleRequest {
        let voltage = self.voltage_cadence.is_due(now) || self.confirmation_sample_due(now);
        if voltage {
            self.voltage_cadence.mark(now);
        }

        let temperature = self.temperature_enabled() && self.temperature_cadence.is_due(now);
        if temperature {
            self.temperature_cadence.mark(now);
        }

        SampleRequest {
            voltage,
            temperature,
        }
    }

    /// Instant the pending start attempt may be judged, while `Starting`.
    pub fn confirmation_deadline(&self) -> Option<Instant> {
        match self.state {
            ControllerState::Starting {
                attempt_started_at,
                ..
            } => Some(attempt_started_at + self.config.retry_delay),
            _ => None,
        }
    }

    fn confirmation_sample_due(&self, now: Instant) -> bool {
        match self.confirmation_deadline() {
            Some(deadline) => {
                now >= deadline && self.voltage_cadence.last().is_none_or(|last| last < deadline)
            }
            None => false,
        }
    }

    /// Next instant the runner must tick. Never earlier than `now`.
    pub fn next_wakeup(&self, now: Instant) -> Instant {
        let mut next = self.voltage_cadence.next_due().unwrap_or(now);

        if self.temperature_enabled() {
            next = next.min(self.temperature_cadence.next_due().unwrap_or(now));
        }

        if let Some(deadline) = self.confirmation_deadline() {
            let sampled_after_deadline = self
                .voltage_cadence
                .last()
                .is_some_and(|last| last >= deadline);
            if !sampled_after_deadline {
                next = next.min(deadline);
            }
        }

        next.max(now)
    }

    // ─── Transitions ────────────────────────────────────────────────

    /// Advance the state machine.
    ///
    /// `fresh_voltage` / `fresh_temperature` are `None` when no new sample was
    /// taken (cadence not due, or the read failed); the last reading is reused.
    /// Non-finite samples are discarded.
    pub fn tick(
        &mut self,
        now: Instant,
        fresh_voltage: Option<f64>,
        fresh_temperature: Option<f64>,
    ) -> Vec<Effect> {
        let fresh_voltage = fresh_voltage.filter(|v| v.is_finite());
        let fresh_temperature = fresh_temperature.filter(|t| t.is_finite());
        self.absorb(now, fresh_voltage, fresh_temperature);

        let Some(reading) = self.reading else {
            return Vec::new();
        };

        match self.state {
            ControllerState::Idle { .. } => self.tick_idle(now, &reading),
            ControllerState::Starting { .. } => self.tick_starting(now, fresh_voltage),
            ControllerState::Running { .. } => self.tick_running(now, &reading),
            ControllerState::Stopping { .. } => Vec::new(),
        }
    }

    /// Report the outcome of a `PulseRelay` effect.
    ///
    /// A failed pulse never advances the machine: `Starting` falls back to
    /// `Idle` without counting an attempt, `Stopping` falls back to `Running`
    /// so the stop is retried on the next tick.
    pub fn pulse_finished(
        &mut self,
        line: RelayLine,
        result: Result<(), &HalError>,
        now: Instant,
    ) -> Vec<Effect> {
        match (self.state, result) {
            (ControllerState::Stopping { run_started_at }, Ok(())) if line == RelayLine::Stop => {
                self.state = ControllerState::idle();
                vec![Effect::emit(
                    EventKind::Stopped,
                    format!(
                        "Generator stopped after {}",
                        format_duration(now.saturating_duration_since(run_started_at))
                    ),
                )]
            }
            (ControllerState::Stopping { run_started_at }, Err(e)) if line == RelayLine::Stop => {
                self.state = ControllerState::Running { run_started_at };
                vec![
                    Effect::SetAllInactive,
                    Effect::emit(
                        EventKind::ActuatorFault,
                        format!("Stop relay failed ({e}); generator still running, will retry"),
                    ),
                ]
            }
            (
                ControllerState::Starting {
                    attempt_started_at,
                    prior_failed_attempts,
                    ..
                },
                Err(e),
            ) if line == RelayLine::Start => {
                self.state = ControllerState::Idle {
                    consecutive_failed_attempts: prior_failed_attempts,
                    last_attempt_at: Some(attempt_started_at),
                    lockout_reported: false,
                    resample_after: Some(now),
                };
                vec![
                    Effect::SetAllInactive,
                    Effect::emit(
                        EventKind::ActuatorFault,
                        format!("Start relay failed ({e}); attempt not counted, will retry"),
                    ),
                ]
            }
            (_, Err(e)) => vec![
                Effect::SetAllInactive,
                Effect::emit(
                    EventKind::ActuatorFault,
                    format!("Unexpected {line} relay failure ({e})"),
                ),
            ],
            (_, Ok(())) => Vec::new(),
        }
    }

    fn absorb(&mut self, now: Instant, fresh_voltage: Option<f64>, fresh_temperature: Option<f64>) {
        if fresh_voltage.is_none() && fresh_temperature.is_none() {
            return;
        }

        let (voltage, observed_at) = match (fresh_voltage, self.reading) {
            (Some(v), _) => (v, now),
            (None, Some(prev)) => (prev.voltage, prev.observed_at),
            // Temperature alone cannot seed a reading.
            (None, None) => return,
        };

        let (temperature, temperature_observed_at) = match fresh_temperature {
            Some(t) => (Some(t), Some(now)),
            None => self
                .reading
                .map_or((None, None), |prev| (prev.temperature, prev.temperature_observed_at)),
        };

        self.reading = Some(SensorReading {
            voltage,
            temperature,
            observed_at,
            temperature_observed_at,
        });
    }

    fn current_temperature(&self, reading: &SensorReading, now: Instant) -> Option<f64> {
        let observed_at = reading.temperature_observed_at?;
        if now.saturating_duration_since(observed_at) > self.config.temperature_max_age() {
            return None;
        }
        reading.temperature
    }

    fn start_demand(&self, reading: &SensorReading, now: Instant) -> Option<StartReason> {
        if reading.voltage < self.config.voltage_start {
            return Some(StartReason::LowVoltage);
        }
        let threshold = self.config.temperature_start_below?;
        let temperature = self.current_temperature(reading, now)?;
        (temperature < threshold).then_some(StartReason::LowTemperature)
    }

    fn describe(&self, reason: StartReason, reading: &SensorReading, now: Instant) -> String {
        match reason {
            StartReason::LowVoltage => format!(
                "battery {:.2} V below {:.2} V",
                reading.voltage, self.config.voltage_start
            ),
            StartReason::LowTemperature => format!(
                "ambient {:.1} °F below {:.1} °F (battery {:.2} V)",
                self.current_temperature(reading, now).unwrap_or(f64::NAN),
                self.config.temperature_start_below.unwrap_or(f64::NAN),
                reading.voltage
            ),
        }
    }

    fn tick_idle(&mut self, now: Instant, reading: &SensorReading) -> Vec<Effect> {
        let ControllerState::Idle {
            mut consecutive_failed_attempts,
            last_attempt_at,
            mut lockout_reported,
            resample_after,
        } = self.state
        else {
            return Vec::new();
        };

        let Some(reason) = self.start_demand(reading, now) else {
            // Condition cleared without an attempt: a new episode begins.
            self.state = ControllerState::idle();
            return Vec::new();
        };

        // The sample that judged (or preceded) the last attempt cannot
        // trigger the next one.
        if resample_after.is_some_and(|after| reading.observed_at <= after) {
            return Vec::new();
        }

        let max = self.config.max_start_attempts;
        let mut effects = Vec::new();

        if consecutive_failed_attempts >= max {
            if let (Some(reset_after), Some(last)) = (self.config.attempt_reset_after, last_attempt_at)
            {
                let since = now.saturating_duration_since(last);
                if since >= reset_after {
                    consecutive_failed_attempts = 0;
                    lockout_reported = false;
                    effects.push(Effect::emit(
                        EventKind::AttemptsReset,
                        format!(
                            "Re-arming start attempts {} after the last attempt",
                            format_duration(since)
                        ),
                    ));
                }
            }
        }

        if consecutive_failed_attempts < max {
            let attempt = consecutive_failed_attempts + 1;
            effects.push(Effect::emit(
                EventKind::StartAttempt,
                format!(
                    "Starting generator (attempt {attempt}/{max}): {}",
                    self.describe(reason, reading, now)
                ),
            ));
            effects.push(Effect::PulseRelay {
                line: RelayLine::Start,
                duration: self.config.start_pulse_duration,
            });
            self.state = ControllerState::Starting {
                attempt_start_voltage: reading.voltage,
                attempt_started_at: now,
                prior_failed_attempts: consecutive_failed_attempts,
            };
            return effects;
        }

        if !lockout_reported {
            effects.push(Effect::emit(
                EventKind::MaxAttemptsReached,
                format!(
                    "Max start attempts reached ({max}); no further attempts until {} recovers",
                    match reason {
                        StartReason::LowVoltage => "battery voltage",
                        StartReason::LowTemperature => "ambient temperature",
                    }
                ),
            ));
            lockout_reported = true;
        }

        self.state = ControllerState::Idle {
            consecutive_failed_attempts,
            last_attempt_at,
            lockout_reported,
            resample_after,
        };
        effects
    }

    fn tick_starting(&mut self, now: Instant, fresh_voltage: Option<f64>) -> Vec<Effect> {
        let ControllerState::Starting {
            attempt_start_voltage,
            attempt_started_at,
            prior_failed_attempts,
        } = self.state
        else {
            return Vec::new();
        };

        // Only a sample taken after the retry delay may judge the attempt.
        let Some(voltage) = fresh_voltage else {
            return Vec::new();
        };
        if now < attempt_started_at + self.config.retry_delay {
            return Vec::new();
        }

        let delta = voltage - attempt_start_voltage;
        let (confirmed, requirement) = match self.config.confirm_policy() {
            ConfirmPolicy::Rise(rise) => (
                delta >= rise - CONFIRM_EPSILON,
                format!("needed +{rise:.2} V"),
            ),
            ConfirmPolicy::Detect(level) => (voltage > level, format!("needed > {level:.2} V")),
        };

        if confirmed {
            self.state = ControllerState::Running {
                run_started_at: now,
            };
            return vec![Effect::emit(
                EventKind::StartConfirmed,
                format!("Generator confirmed running: {voltage:.2} V ({delta:+.2} V since start pulse)"),
            )];
        }

        let failed = prior_failed_attempts + 1;
        self.state = ControllerState::Idle {
            consecutive_failed_attempts: failed,
            last_attempt_at: Some(attempt_started_at),
            lockout_reported: false,
            resample_after: Some(now),
        };
        vec![Effect::emit(
            EventKind::StartFailed,
            format!(
                "Start attempt {failed}/{} failed: {voltage:.2} V ({delta:+.2} V, {requirement})",
                self.config.max_start_attempts
            ),
        )]
    }

    fn tick_running(&mut self, now: Instant, reading: &SensorReading) -> Vec<Effect> {
        let ControllerState::Running { run_started_at } = self.state else {
            return Vec::new();
        };

        let run_time = now.saturating_duration_since(run_started_at);
        if run_time < self.config.min_run_time || reading.voltage < self.config.voltage_stop {
            return Vec::new();
        }

        self.state = ControllerState::Stopping { run_started_at };
        vec![
            Effect::emit(
                EventKind::Stopping,
                format!(
                    "Stopping generator: battery {:.2} V after {}",
                    reading.voltage,
                    format_duration(run_time)
                ),
            ),
            Effect::PulseRelay {
                line: RelayLine::Stop,
                duration: self.config.stop_pulse_duration,
            },
        ]
    }
}

/// `1h 05m`, `31m 20s`, `45s`.
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, _) => format!("{h}h {m:02}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ControllerConfig {
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

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn no_reading_no_effects() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        assert!(ctl.tick(t0, None, None).is_empty());
        // Temperature alone does not seed a reading.
        assert!(ctl.tick(t0, None, Some(20.0)).is_empty());
        assert!(ctl.reading().is_none());
    }

    #[test]
    fn repeated_ticks_without_fresh_sample_are_idempotent() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        let first = ctl.tick(t0, Some(11.9), None);
        assert_eq!(first.len(), 2);
        for _ in 0..5 {
            assert!(ctl.tick(t0, None, None).is_empty());
        }
        assert!(matches!(ctl.state(), ControllerState::Starting { .. }));
    }

    #[test]
    fn rejected_attempt_waits_for_a_newer_sample() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        ctl.tick(t0, Some(11.9), None);
        ctl.pulse_finished(RelayLine::Start, Ok(()), t0 + secs(2));

        let judged = ctl.tick(t0 + secs(60), Some(12.1), None);
        assert_eq!(judged.len(), 1);
        assert_eq!(judged[0].event_kind(), Some(EventKind::StartFailed));

        for _ in 0..3 {
            assert!(ctl.tick(t0 + secs(60), None, None).is_empty());
        }
        assert!(ctl.tick(t0 + secs(62), None, None).is_empty());
        assert_eq!(ctl.state().failed_attempts(), 1);

        let retry = ctl.tick(t0 + secs(65), Some(12.0), None);
        assert_eq!(retry[0].event_kind(), Some(EventKind::StartAttempt));
        assert!(retry.contains(&Effect::PulseRelay {
            line: RelayLine::Start,
            duration: secs(2),
        }));
    }

    #[test]
    fn non_finite_sample_is_ignored() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        assert!(ctl.tick(t0, Some(f64::NAN), None).is_empty());
        assert!(ctl.reading().is_none());
    }

    #[test]
    fn stale_sample_cannot_judge_attempt() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        ctl.tick(t0, Some(11.9), None);
        // Deadline passed but no fresh sample supplied.
        assert!(ctl.tick(t0 + secs(90), None, None).is_empty());
        assert!(matches!(ctl.state(), ControllerState::Starting { .. }));
        // Fresh sample before the deadline is not enough either.
        assert!(ctl.tick(t0 + secs(30), Some(13.0), None).is_empty());
        assert!(matches!(ctl.state(), ControllerState::Starting { .. }));
    }

    #[test]
    fn low_voltage_and_low_temperature_issue_one_pulse() {
        let mut cfg = config();
        cfg.temperature_start_below = Some(35.0);
        let mut ctl = GeneratorController::new(cfg);
        let effects = ctl.tick(Instant::now(), Some(11.5), Some(20.0));

        let pulses = effects
            .iter()
            .filter(|e| matches!(e, Effect::PulseRelay { .. }))
            .count();
        assert_eq!(pulses, 1);
        match &effects[0] {
            Effect::Emit { message, .. } => assert!(message.contains("battery 11.50 V")),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn temperature_alone_triggers_start() {
        let mut cfg = config();
        cfg.temperature_start_below = Some(35.0);
        let mut ctl = GeneratorController::new(cfg);
        let effects = ctl.tick(Instant::now(), Some(12.8), Some(30.0));
        assert!(effects.contains(&Effect::PulseRelay {
            line: RelayLine::Start,
            duration: secs(2),
        }));
        match &effects[0] {
            Effect::Emit { message, .. } => assert!(message.contains("ambient 30.0 °F")),
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn stale_temperature_is_ignored() {
        let mut cfg = config();
        cfg.temperature_start_below = Some(35.0);
        let ctl = GeneratorController::new(cfg);
        let t0 = Instant::now();
        let reading = SensorReading {
            voltage: 12.8,
            temperature: Some(30.0),
            observed_at: t0 + secs(600),
            temperature_observed_at: Some(t0),
        };

        assert_eq!(
            ctl.start_demand(&reading, t0 + secs(10)),
            Some(StartReason::LowTemperature)
        );
        // Three sample intervals without a fresh probe reading.
        assert_eq!(ctl.start_demand(&reading, t0 + secs(181)), None);
    }

    #[test]
    fn temperature_without_trigger_never_starts() {
        let mut ctl = GeneratorController::new(config());
        assert!(ctl.tick(Instant::now(), Some(12.8), Some(-10.0)).is_empty());
    }

    #[test]
    fn failed_start_pulse_rolls_back_without_counting() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        ctl.tick(t0, Some(11.9), None);

        let err = HalError::ActuatorError {
            line: RelayLine::Start,
            reason: "EBUSY".to_string(),
        };
        let effects = ctl.pulse_finished(RelayLine::Start, Err(&err), t0 + secs(2));
        assert_eq!(effects[0], Effect::SetAllInactive);
        assert_eq!(effects[1].event_kind(), Some(EventKind::ActuatorFault));
        assert_eq!(ctl.state().failed_attempts(), 0);
        assert!(matches!(ctl.state(), ControllerState::Idle { .. }));

        // The pre-pulse reading does not retrigger; the next cadence does.
        assert!(ctl.tick(t0 + secs(2), None, None).is_empty());
        assert!(ctl.tick(t0 + secs(3), None, None).is_empty());
        let retry = ctl.tick(t0 + secs(5), Some(11.9), None);
        assert!(retry.iter().any(|e| matches!(e, Effect::PulseRelay { .. })));
    }

    #[test]
    fn failed_stop_pulse_returns_to_running() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        ctl.tick(t0, Some(11.9), None);
        ctl.pulse_finished(RelayLine::Start, Ok(()), t0 + secs(2));
        ctl.tick(t0 + secs(60), Some(12.5), None);
        let started = t0 + secs(60);
        assert_eq!(
            ctl.state(),
            ControllerState::Running {
                run_started_at: started
            }
        );

        let effects = ctl.tick(started + secs(1800), Some(13.7), None);
        assert_eq!(effects.len(), 2);
        assert!(matches!(ctl.state(), ControllerState::Stopping { .. }));
        // Stopping ignores ticks until the pulse outcome arrives.
        assert!(ctl.tick(started + secs(1801), Some(13.7), None).is_empty());

        let err = HalError::ActuatorError {
            line: RelayLine::Stop,
            reason: "EIO".to_string(),
        };
        ctl.pulse_finished(RelayLine::Stop, Err(&err), started + secs(1802));
        assert_eq!(
            ctl.state(),
            ControllerState::Running {
                run_started_at: started
            }
        );

        // Retried on the next tick.
        let retry = ctl.tick(started + secs(1805), None, None);
        assert!(retry.contains(&Effect::PulseRelay {
            line: RelayLine::Stop,
            duration: secs(2),
        }));
    }

    #[test]
    fn sample_request_marks_cadence() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        assert_eq!(
            ctl.sample_request(t0),
            SampleRequest {
                voltage: true,
                temperature: false
            }
        );
        assert!(!ctl.sample_request(t0 + secs(1)).voltage);
        assert!(ctl.sample_request(t0 + secs(5)).voltage);
    }

    #[test]
    fn confirmation_deadline_forces_voltage_sample() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        ctl.sample_request(t0);
        ctl.tick(t0, Some(11.9), None);

        // Cadence sampled at t0+58; the deadline at t0+60 still needs a read.
        ctl.sample_request(t0 + secs(58));
        assert_eq!(ctl.next_wakeup(t0 + secs(58)), t0 + secs(60));
        assert!(!ctl.sample_request(t0 + secs(59)).voltage);
        assert!(ctl.sample_request(t0 + secs(60)).voltage);
        // Satisfied: back to the plain cadence.
        assert_eq!(ctl.next_wakeup(t0 + secs(60)), t0 + secs(65));
    }

    #[test]
    fn next_wakeup_never_in_the_past() {
        let mut ctl = GeneratorController::new(config());
        let t0 = Instant::now();
        assert_eq!(ctl.next_wakeup(t0), t0);
        ctl.sample_request(t0);
        assert_eq!(ctl.next_wakeup(t0 + secs(30)), t0 + secs(30));
    }

    #[test]
    fn format_duration_shapes() {
        assert_eq!(format_duration(secs(45)), "45s");
        assert_eq!(format_duration(secs(1880)), "31m 20s");
        assert_eq!(format_duration(secs(3900)), "1h 05m");
    }
}
