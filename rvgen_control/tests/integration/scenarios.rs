//! Reference scenarios for start confirmation, stop timing and retry limits.

use std::time::Duration;

use rvgen_common::hal::driver::RelayLine;
use rvgen_control::{ControllerState, Effect, EventKind};

use super::harness::{Harness, has_pulse, scenario_config};

/// Drive the harness into `Running`, confirmed at `t0 + 60`.
fn running_harness() -> Harness {
    let mut h = Harness::new(scenario_config());
    h.tick(0, Some(11.9));
    h.tick(60, Some(12.5));
    assert!(matches!(h.ctl.state(), ControllerState::Running { .. }));
    h
}

#[test]
fn scenario_a_insufficient_rise_fails_attempt() {
    let mut h = Harness::new(scenario_config());

    let effects = h.tick(0, Some(11.9));
    assert!(effects.contains(&Effect::PulseRelay {
        line: RelayLine::Start,
        duration: Duration::from_secs(2),
    }));
    assert!(matches!(h.ctl.state(), ControllerState::Starting { .. }));

    let effects = h.tick(60, Some(12.1));
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].event_kind(), Some(EventKind::StartFailed));
    match h.ctl.state() {
        ControllerState::Idle {
            consecutive_failed_attempts,
            ..
        } => assert_eq!(consecutive_failed_attempts, 1),
        other => panic!("expected Idle, got {other:?}"),
    }
}

#[test]
fn scenario_b_sufficient_rise_confirms_running() {
    let mut h = Harness::new(scenario_config());
    h.tick(0, Some(11.9));

    let effects = h.tick(60, Some(12.3));
    assert_eq!(effects[0].event_kind(), Some(EventKind::StartConfirmed));
    assert_eq!(
        h.ctl.state(),
        ControllerState::Running {
            run_started_at: h.at(60)
        }
    );
    assert_eq!(h.ctl.state().failed_attempts(), 0);
}

#[test]
fn confirmation_after_earlier_failures_resets_counter() {
    let mut h = Harness::new(scenario_config());
    h.tick(0, Some(11.9));
    h.tick(60, Some(12.0));
    h.tick(65, Some(11.9));
    h.tick(125, Some(12.0));
    assert_eq!(h.ctl.state().failed_attempts(), 2);

    h.tick(130, Some(11.9));
    h.tick(190, Some(12.4));
    assert!(matches!(h.ctl.state(), ControllerState::Running { .. }));
    assert_eq!(h.ctl.state().failed_attempts(), 0);
}

#[test]
fn scenario_c_stop_requires_time_and_voltage() {
    let mut h = running_harness();
    let run_start = 60;

    let effects = h.tick(run_start + 1000, Some(13.8));
    assert!(effects.is_empty(), "min run time not elapsed");

    let effects = h.tick(run_start + 1800, Some(13.5));
    assert!(effects.is_empty(), "stop voltage not reached");

    let effects = h.tick(run_start + 1800, Some(13.6));
    assert!(has_pulse(&effects, RelayLine::Stop));
    assert_eq!(effects[0].event_kind(), Some(EventKind::Stopping));
    assert_eq!(h.ctl.state(), ControllerState::idle());
    assert_eq!(h.count(EventKind::Stopped), 1);
}

#[test]
fn stopping_is_visible_until_pulse_reported() {
    let mut h = running_harness();
    let now = h.at(60 + 1800);
    let effects = h.ctl.tick(now, Some(13.9), None);
    assert!(has_pulse(&effects, RelayLine::Stop));
    assert!(matches!(h.ctl.state(), ControllerState::Stopping { .. }));

    let follow_up = h.ctl.pulse_finished(RelayLine::Stop, Ok(()), now);
    assert_eq!(follow_up[0].event_kind(), Some(EventKind::Stopped));
    assert_eq!(h.ctl.state(), ControllerState::idle());
}

#[test]
fn scenario_d_attempt_ceiling_reports_once() {
    let mut h = Harness::new(scenario_config());
    let mut t = 0;
    for _ in 0..3 {
        h.tick(t, Some(11.9));
        h.tick(t + 60, Some(12.0));
        t += 65;
    }
    assert_eq!(h.start_pulses(), 3);
    assert_eq!(h.ctl.state().failed_attempts(), 3);

    let effects = h.tick(t, Some(11.9));
    assert!(!has_pulse(&effects, RelayLine::Start));
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].event_kind(), Some(EventKind::MaxAttemptsReached));

    // Sticky for the rest of the episode, and reported only once.
    for step in 1..20 {
        assert!(h.tick(t + step * 5, Some(11.8)).is_empty());
    }
    assert_eq!(h.start_pulses(), 3);
}

#[test]
fn recovery_ends_episode_and_rearms_attempts() {
    let mut h = Harness::new(scenario_config());
    let mut t = 0;
    for _ in 0..3 {
        h.tick(t, Some(11.9));
        h.tick(t + 60, Some(12.0));
        t += 65;
    }
    h.tick(t, Some(11.9));
    assert_eq!(h.ctl.state().failed_attempts(), 3);

    // Shore power (or sun) lifts the battery: counter resets without effects.
    assert!(h.tick(t + 5, Some(12.6)).is_empty());
    assert_eq!(h.ctl.state(), ControllerState::idle());

    let effects = h.tick(t + 10, Some(12.1));
    assert!(has_pulse(&effects, RelayLine::Start));
}

#[test]
fn time_based_reset_rearms_when_configured() {
    let mut config = scenario_config();
    config.attempt_reset_after = Some(Duration::from_secs(3600));
    let mut h = Harness::new(config);

    let mut t = 0;
    for _ in 0..3 {
        h.tick(t, Some(11.9));
        h.tick(t + 60, Some(12.0));
        t += 65;
    }
    // Last attempt started at t0 + 130.
    h.tick(t, Some(11.9));
    assert_eq!(h.count(EventKind::MaxAttemptsReached), 1);
    assert!(h.tick(130 + 3599, Some(11.9)).is_empty());

    let effects = h.tick(130 + 3600, Some(11.9));
    assert_eq!(effects[0].event_kind(), Some(EventKind::AttemptsReset));
    assert!(has_pulse(&effects, RelayLine::Start));
    assert_eq!(h.start_pulses(), 4);
}

#[test]
fn detection_policy_uses_absolute_margin() {
    let mut config = scenario_config();
    config.voltage_rise_confirm = 0.0;
    let mut h = Harness::new(config);

    // A big rise that still sits below voltage_start + margin is a failure.
    h.tick(0, Some(11.0));
    h.tick(60, Some(12.7));
    assert_eq!(h.count(EventKind::StartFailed), 1);

    h.tick(65, Some(11.0));
    h.tick(125, Some(12.81));
    assert!(matches!(h.ctl.state(), ControllerState::Running { .. }));
}

#[test]
fn temperature_trigger_starts_and_stops_normally() {
    let mut config = scenario_config();
    config.temperature_start_below = Some(35.0);
    let mut h = Harness::new(config);

    let effects = h.tick_with(0, Some(12.8), Some(28.0));
    assert!(has_pulse(&effects, RelayLine::Start));
    h.tick(60, Some(13.2));
    assert!(matches!(h.ctl.state(), ControllerState::Running { .. }));

    h.tick(60 + 1800, Some(13.7));
    assert_eq!(h.stop_pulses(), 1);
}

#[test]
fn temperature_probe_loss_never_blocks_voltage_logic() {
    let mut config = scenario_config();
    config.temperature_start_below = Some(35.0);
    let mut h = Harness::new(config);

    // Probe never reports; voltage alone drives the machine.
    let effects = h.tick_with(0, Some(11.9), None);
    assert!(has_pulse(&effects, RelayLine::Start));
    h.tick_with(60, Some(12.4), None);
    assert!(matches!(h.ctl.state(), ControllerState::Running { .. }));
}
