//! Immutable controller configuration.
//!
//! Built once at startup from the validated [`ControlSettings`] and never
//! mutated afterwards.

use std::time::Duration;

use rvgen_common::config::ConfigError;
use rvgen_common::consts::MAX_DURATION_SECS;
use rvgen_common::hal::config::ControlSettings;

/// Thresholds and timing for [`GeneratorController`](crate::GeneratorController).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Start when the battery drops below this voltage (V).
    pub voltage_start: f64,
    /// Stop (after `min_run_time`) once the battery reaches this voltage (V).
    pub voltage_stop: f64,
    /// Rise required to confirm a start; `0.0` selects detection.
    pub voltage_rise_confirm: f64,
    /// Detection policy margin above `voltage_start` (V).
    pub detect_margin: f64,
    /// Start relay hold time.
    pub start_pulse_duration: Duration,
    /// Stop relay hold time.
    pub stop_pulse_duration: Duration,
    /// Minimum run time before a stop is considered.
    pub min_run_time: Duration,
    /// Wait after a start pulse before judging the attempt.
    pub retry_delay: Duration,
    /// Ceiling on consecutive failed attempts per low-condition episode.
    pub max_start_attempts: u32,
    /// Re-arm attempts this long after the last one once the ceiling is hit.
    pub attempt_reset_after: Option<Duration>,
    /// Voltage sampling cadence.
    pub voltage_sample_interval: Duration,
    /// Temperature sampling cadence.
    pub temperature_sample_interval: Duration,
    /// Start when ambient temperature falls below this (°F).
    pub temperature_start_below: Option<f64>,
}

/// How a start attempt is judged after `retry_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmPolicy {
    /// Fresh voltage must exceed the pre-pulse voltage by at least this much.
    Rise(f64),
    /// Fresh voltage must exceed this absolute level.
    Detect(f64),
}

impl ControllerConfig {
    /// Build from file/environment settings.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if the settings violate any threshold
    /// or timing rule.
    pub fn from_settings(settings: &ControlSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let config = Self {
            voltage_start: settings.voltage_start,
            voltage_stop: settings.voltage_stop,
            voltage_rise_confirm: settings.voltage_rise_confirm,
            detect_margin: settings.detect_margin,
            start_pulse_duration: secs("start_pulse_secs", settings.start_pulse_secs)?,
            stop_pulse_duration: secs("stop_pulse_secs", settings.stop_pulse_secs)?,
            min_run_time: secs("min_run_secs", settings.min_run_secs)?,
            retry_delay: secs("retry_delay_secs", settings.retry_delay_secs)?,
            max_start_attempts: settings.max_start_attempts,
            attempt_reset_after: settings
                .attempt_reset_secs
                .map(|s| secs("attempt_reset_secs", s))
                .transpose()?,
            voltage_sample_interval: secs("voltage_sample_secs", settings.voltage_sample_secs)?,
            temperature_sample_interval: secs("temp_sample_secs", settings.temp_sample_secs)?,
            temperature_start_below: settings.temperature_trigger(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that the controller relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.voltage_start < self.voltage_stop) {
            return Err(ConfigError::ValidationError(format!(
                "voltage_start ({}) must be below voltage_stop ({})",
                self.voltage_start, self.voltage_stop
            )));
        }
        if self.max_start_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_start_attempts must be greater than 0".to_string(),
            ));
        }
        if !(self.voltage_rise_confirm >= 0.0) {
            return Err(ConfigError::ValidationError(
                "voltage_rise_confirm must be >= 0".to_string(),
            ));
        }
        if self.voltage_sample_interval.is_zero() || self.temperature_sample_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "sample intervals must be greater than 0".to_string(),
            ));
        }
        let longest = [
            self.start_pulse_duration,
            self.stop_pulse_duration,
            self.min_run_time,
            self.retry_delay,
            self.voltage_sample_interval,
            self.temperature_sample_interval,
        ]
        .into_iter()
        .chain(self.attempt_reset_after)
        .max()
        .unwrap_or_default();
        if longest.as_secs_f64() > MAX_DURATION_SECS {
            return Err(ConfigError::ValidationError(format!(
                "durations must not exceed {MAX_DURATION_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Confirmation policy selected by `voltage_rise_confirm`.
    pub fn confirm_policy(&self) -> ConfirmPolicy {
        if self.voltage_rise_confirm > 0.0 {
            ConfirmPolicy::Rise(self.voltage_rise_confirm)
        } else {
            ConfirmPolicy::Detect(self.voltage_start + self.detect_margin)
        }
    }

    /// Age after which a temperature reading is no longer trusted.
    pub fn temperature_max_age(&self) -> Duration {
        self.temperature_sample_interval.saturating_mul(3)
    }
}

fn secs(name: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::ValidationError(format!("{name} = {value}: {e}")))
}

impl Default for ControllerConfig {
    fn default() -> Self {
        // Defaults are valid by construction (checked in rvgen_common::consts).
        match Self::from_settings(&ControlSettings::default()) {
            Ok(config) => config,
            Err(e) => unreachable!("default control settings rejected: {e}"),
        }
    }
}
