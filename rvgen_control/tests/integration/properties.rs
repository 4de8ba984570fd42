//! Property tests over arbitrary sample sequences.

use proptest::prelude::*;

use rvgen_common::hal::driver::RelayLine;
use rvgen_control::{ControllerState, Effect, EventKind};

use super::harness::{Harness, has_pulse, scenario_config};

proptest! {
    #[test]
    fn start_pulses_never_exceed_ceiling_below_start_threshold(
        voltages in prop::collection::vec(10.0f64..12.29, 1..200),
    ) {
        let mut h = Harness::new(scenario_config());
        for (i, v) in voltages.iter().enumerate() {
            h.tick(i as u64 * 5, Some(*v));
        }
        prop_assert!(h.start_pulses() <= 3);
        prop_assert!(h.count(EventKind::MaxAttemptsReached) <= 1);
    }

    #[test]
    fn confirmation_clears_failure_count(
        failures in 0u32..3,
        rise in 0.3f64..1.5,
    ) {
        let mut h = Harness::new(scenario_config());
        let mut t = 0;
        for _ in 0..failures {
            h.tick(t, Some(11.9));
            h.tick(t + 60, Some(12.0));
            t += 65;
        }
        prop_assert_eq!(h.ctl.state().failed_attempts(), failures);

        h.tick(t, Some(11.9));
        h.tick(t + 60, Some(11.9 + rise));
        prop_assert!(
            matches!(h.ctl.state(), ControllerState::Running { .. }),
            "state {:?}", h.ctl.state()
        );
        prop_assert_eq!(h.ctl.state().failed_attempts(), 0);

        // The next episode starts counting from one again.
        h.tick(t + 60 + 1800, Some(13.8));
        let effects = h.tick(t + 60 + 1805, Some(11.8));
        match &effects[0] {
            Effect::Emit { kind: EventKind::StartAttempt, message } => {
                prop_assert!(message.contains("attempt 1/3"), "{}", message);
            }
            other => prop_assert!(false, "unexpected effect {:?}", other),
        }
    }

    #[test]
    fn stop_iff_min_run_and_stop_voltage(
        elapsed in 0u64..4000,
        voltage in 12.5f64..14.5,
    ) {
        let mut h = Harness::new(scenario_config());
        h.tick(0, Some(11.9));
        h.tick(60, Some(12.5));
        prop_assert!(matches!(h.ctl.state(), ControllerState::Running { .. }), "expected Running state");

        let effects = h.tick(60 + elapsed, Some(voltage));
        let expect_stop = elapsed >= 1800 && voltage >= 13.6;
        prop_assert_eq!(has_pulse(&effects, RelayLine::Stop), expect_stop);
        prop_assert!(!has_pulse(&effects, RelayLine::Start));
    }

    #[test]
    fn repeated_ticks_without_samples_settle(
        voltages in prop::collection::vec(10.5f64..14.5, 1..60),
        gap in 1u64..120,
    ) {
        let mut h = Harness::new(scenario_config());
        let mut t = 0;
        for v in voltages {
            h.tick(t, Some(v));

            let pulses = h.pulses.len();
            for _ in 0..3 {
                let repeat = h.tick(t, None);
                prop_assert!(repeat.is_empty(), "repeat tick produced {:?}", repeat);
            }
            prop_assert_eq!(h.pulses.len(), pulses);
            t += gap;
        }
    }
}
