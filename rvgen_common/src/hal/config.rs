//! HAL configuration types.
//!
//! `GeneratorConfig` is loaded from `rvgen.toml` and then overridden key by key
//! from the process environment (`VOLTAGE_START`, `RETRY_DELAY`, ...), so a
//! systemd `EnvironmentFile=` works without a TOML file at all.
//!
//! - `ControlSettings` - thresholds and timing for the start/stop controller
//! - `LoggingSettings` - operator event log and status cadence
//! - `SensorSettings` / `RelaySettings` - bus and line addressing
//! - `SmtpSettings` - alert delivery
//! - `SimulationSettings` - plant model for the simulation driver

use crate::config::{ConfigError, ConfigLoader, SharedConfig};
use crate::consts::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Service identity and log level.
    pub shared: SharedConfig,
    /// Controller thresholds and timing.
    pub control: ControlSettings,
    /// Event log and status line.
    pub logging: LoggingSettings,
    /// Voltage sensor and temperature probe addressing.
    pub sensor: SensorSettings,
    /// Relay line addressing.
    pub relay: RelaySettings,
    /// Alert delivery; alerts are only logged when absent.
    pub smtp: Option<SmtpSettings>,
    /// Plant model used by the `simulation` driver.
    pub simulation: SimulationSettings,
}

/// Controller thresholds and timing, in volts and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Start when the battery drops below this voltage.
    pub voltage_start: f64,
    /// Stop (after `min_run_secs`) once the battery reaches this voltage.
    pub voltage_stop: f64,
    /// Required rise after `retry_delay_secs` to confirm a start. `0` selects
    /// plain detection (`voltage > voltage_start + detect_margin`).
    pub voltage_rise_confirm: f64,
    /// Margin used by the detection policy.
    pub detect_margin: f64,
    /// Start relay hold time.
    pub start_pulse_secs: f64,
    /// Stop relay hold time.
    pub stop_pulse_secs: f64,
    /// Minimum run time before a stop is considered.
    pub min_run_secs: f64,
    /// Wait after a start pulse before judging the attempt.
    pub retry_delay_secs: f64,
    /// Consecutive failed attempts before giving up for the episode.
    pub max_start_attempts: u32,
    /// Re-arm start attempts this long after the last one once the ceiling
    /// was hit. Disabled when absent.
    pub attempt_reset_secs: Option<f64>,
    /// Voltage sampling interval.
    pub voltage_sample_secs: f64,
    /// Temperature sampling interval.
    pub temp_sample_secs: f64,
    /// Enable the low-temperature start trigger.
    pub temp_enable: bool,
    /// Start when ambient temperature falls below this (°F).
    pub temp_start_below: Option<f64>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            voltage_start: DEFAULT_VOLTAGE_START,
            voltage_stop: DEFAULT_VOLTAGE_STOP,
            voltage_rise_confirm: DEFAULT_VOLTAGE_RISE_CONFIRM,
            detect_margin: DEFAULT_DETECT_MARGIN,
            start_pulse_secs: DEFAULT_START_PULSE_SECS,
            stop_pulse_secs: DEFAULT_STOP_PULSE_SECS,
            min_run_secs: DEFAULT_MIN_RUN_SECS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            max_start_attempts: DEFAULT_MAX_START_ATTEMPTS,
            attempt_reset_secs: None,
            voltage_sample_secs: DEFAULT_VOLTAGE_SAMPLE_SECS,
            temp_sample_secs: DEFAULT_TEMP_SAMPLE_SECS,
            temp_enable: false,
            temp_start_below: None,
        }
    }
}

impl ControlSettings {
    /// Temperature start threshold, if the trigger is enabled.
    pub fn temperature_trigger(&self) -> Option<f64> {
        if self.temp_enable {
            self.temp_start_below
        } else {
            None
        }
    }

    /// Validate thresholds and timing.
    ///
    /// # Validation Rules
    /// 1. `voltage_start < voltage_stop`
    /// 2. `voltage_rise_confirm >= 0`, `detect_margin >= 0`
    /// 3. every duration in `(0, MAX_DURATION_SECS]` (reset time, when set, too)
    /// 4. `max_start_attempts > 0`
    /// 5. `temp_start_below` present when `temp_enable`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.voltage_start < self.voltage_stop) {
            return Err(ConfigError::ValidationError(format!(
                "voltage_start ({}) must be below voltage_stop ({})",
                self.voltage_start, self.voltage_stop
            )));
        }
        if !(self.voltage_rise_confirm >= 0.0) {
            return Err(ConfigError::ValidationError(
                "voltage_rise_confirm must be >= 0".to_string(),
            ));
        }
        if !(self.detect_margin >= 0.0) {
            return Err(ConfigError::ValidationError(
                "detect_margin must be >= 0".to_string(),
            ));
        }

        let durations = [
            ("start_pulse_secs", self.start_pulse_secs),
            ("stop_pulse_secs", self.stop_pulse_secs),
            ("min_run_secs", self.min_run_secs),
            ("retry_delay_secs", self.retry_delay_secs),
            ("voltage_sample_secs", self.voltage_sample_secs),
            ("temp_sample_secs", self.temp_sample_secs),
        ];
        for (name, secs) in durations {
            ensure_positive_secs(name, secs)?;
        }
        if let Some(secs) = self.attempt_reset_secs {
            ensure_positive_secs("attempt_reset_secs", secs)?;
        }

        if self.max_start_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_start_attempts must be greater than 0".to_string(),
            ));
        }
        if self.temp_enable && self.temp_start_below.is_none() {
            return Err(ConfigError::ValidationError(
                "temp_enable requires temp_start_below".to_string(),
            ));
        }
        Ok(())
    }
}

fn ensure_positive_secs(name: &str, secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && secs > 0.0 && secs <= MAX_DURATION_SECS {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{name} must be between 0 and {MAX_DURATION_SECS} seconds (got {secs})"
        )))
    }
}

/// Operator event log settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Append-only event log. No file is written when absent.
    pub log_file: Option<PathBuf>,
    /// Battery status line interval.
    pub log_interval_secs: f64,
    /// Event-log lines attached to alerts.
    pub alert_tail_lines: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            log_interval_secs: DEFAULT_LOG_INTERVAL_SECS,
            alert_tail_lines: DEFAULT_ALERT_TAIL_LINES,
        }
    }
}

/// Sensor addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// I2C bus number (`/dev/i2c-N`).
    pub i2c_bus: u8,
    /// INA226 slave address.
    pub ina226_addr: u16,
    /// 1-Wire temperature probe file (DS18B20 `w1_slave`).
    pub w1_device: Option<PathBuf>,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            i2c_bus: DEFAULT_I2C_BUS,
            ina226_addr: DEFAULT_INA226_ADDR,
            w1_device: None,
        }
    }
}

/// Relay line addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// GPIO chip name, e.g. `gpiochip0`.
    pub gpio_chip: String,
    /// Start relay line offset on the chip.
    pub start_line: u32,
    /// Stop relay line offset on the chip.
    pub stop_line: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            gpio_chip: DEFAULT_GPIO_CHIP.to_string(),
            start_line: DEFAULT_RELAY_START_LINE,
            stop_line: DEFAULT_RELAY_STOP_LINE,
        }
    }
}

/// SMTP alert delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpSettings {
    /// Relay host.
    pub host: String,
    /// Submission port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Login user.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Use STARTTLS.
    #[serde(default = "default_true")]
    pub tls: bool,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    /// Alert recipients.
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_true() -> bool {
    true
}

impl SmtpSettings {
    fn with_host(host: String) -> Self {
        Self {
            host,
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            tls: true,
            from: String::new(),
            recipients: Vec::new(),
        }
    }
}

/// Plant model for the simulation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Battery voltage at startup.
    pub initial_voltage: f64,
    /// Voltage lost per second while the generator is off.
    pub discharge_rate: f64,
    /// Voltage gained per second while the generator runs.
    pub charge_rate: f64,
    /// Immediate rise when the generator catches.
    pub start_jump: f64,
    /// Floor of the battery model.
    pub min_voltage: f64,
    /// Ceiling of the battery model (absorption voltage).
    pub max_voltage: f64,
    /// Number of start pulses that fail before the generator catches.
    pub failed_starts: u32,
    /// Simulated ambient temperature (°F); no probe when absent.
    pub ambient_temperature: Option<f64>,
    /// Plant time multiplier (10.0 = ten plant seconds per wall second).
    pub time_scale: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            initial_voltage: 11.8,
            discharge_rate: 0.0005,
            charge_rate: 0.004,
            start_jump: 0.6,
            min_voltage: 10.5,
            max_voltage: 14.4,
            failed_starts: 0,
            ambient_temperature: None,
            time_scale: 1.0,
        }
    }
}

impl GeneratorConfig {
    /// Load, apply process-environment overrides and validate.
    ///
    /// With `path == None` the default path is tried and a missing file falls
    /// back to built-in defaults. An explicit path must exist.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::load(Path::new(DEFAULT_CONFIG_PATH)) {
                Ok(config) => config,
                Err(ConfigError::FileNotFound) => Self::default(),
                Err(e) => return Err(e),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style `KEY=value` pairs.
    ///
    /// `lookup` returns the raw value for a key, `None` when unset. Empty
    /// values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let c = &mut self.control;
        override_parsed(&get, "VOLTAGE_START", &mut c.voltage_start)?;
        override_parsed(&get, "VOLTAGE_STOP", &mut c.voltage_stop)?;
        override_parsed(&get, "VOLTAGE_RISE_CONFIRM", &mut c.voltage_rise_confirm)?;
        override_parsed(&get, "DETECT_MARGIN", &mut c.detect_margin)?;
        override_parsed(&get, "START_PULSE_TIME", &mut c.start_pulse_secs)?;
        override_parsed(&get, "STOP_PULSE_TIME", &mut c.stop_pulse_secs)?;
        override_parsed(&get, "MIN_RUN_TIME", &mut c.min_run_secs)?;
        override_parsed(&get, "RETRY_DELAY", &mut c.retry_delay_secs)?;
        override_parsed(&get, "MAX_START_ATTEMPTS", &mut c.max_start_attempts)?;
        override_parsed(&get, "VOLTAGE_SAMPLE_INTERVAL", &mut c.voltage_sample_secs)?;
        override_parsed(&get, "TEMP_SAMPLE_INTERVAL", &mut c.temp_sample_secs)?;
        if let Some(raw) = get("TEMP_ENABLE") {
            c.temp_enable = parse_bool("TEMP_ENABLE", &raw)?;
        }
        if let Some(raw) = get("TEMP_START_BELOW") {
            c.temp_start_below = Some(parse_value("TEMP_START_BELOW", &raw)?);
        }
        if let Some(raw) = get("ATTEMPT_RESET_TIME") {
            let secs: f64 = parse_value("ATTEMPT_RESET_TIME", &raw)?;
            c.attempt_reset_secs = (secs > 0.0).then_some(secs);
        }

        let l = &mut self.logging;
        override_parsed(&get, "LOG_INTERVAL", &mut l.log_interval_secs)?;
        if let Some(raw) = get("LOG_FILE") {
            l.log_file = Some(PathBuf::from(raw));
        }

        let s = &mut self.sensor;
        override_parsed(&get, "I2C_BUS", &mut s.i2c_bus)?;
        if let Some(raw) = get("INA226_ADDR") {
            s.ina226_addr = parse_address("INA226_ADDR", &raw)?;
        }
        if let Some(raw) = get("W1_DEVICE") {
            s.w1_device = Some(PathBuf::from(raw));
        }

        let r = &mut self.relay;
        if let Some(raw) = get("GPIO_CHIP") {
            r.gpio_chip = raw;
        }
        override_parsed(&get, "RELAY_START_GPIO", &mut r.start_line)?;
        override_parsed(&get, "RELAY_STOP_GPIO", &mut r.stop_line)?;

        if let Some(host) = get("SMTP_HOST") {
            match self.smtp.as_mut() {
                Some(smtp) => smtp.host = host,
                None => self.smtp = Some(SmtpSettings::with_host(host)),
            }
        }
        if let Some(smtp) = self.smtp.as_mut() {
            override_parsed(&get, "SMTP_PORT", &mut smtp.port)?;
            if let Some(raw) = get("SMTP_USER") {
                smtp.username = Some(raw);
            }
            if let Some(raw) = get("SMTP_PASSWORD") {
                smtp.password = Some(raw);
            }
            if let Some(raw) = get("SMTP_TLS") {
                smtp.tls = parse_bool("SMTP_TLS", &raw)?;
            }
            if let Some(raw) = get("SMTP_FROM") {
                smtp.from = raw;
            }
            if let Some(raw) = get("ALERT_RECIPIENTS") {
                smtp.recipients = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
        Ok(())
    }

    /// Validate the complete configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.control.validate()?;

        ensure_positive_secs("log_interval_secs", self.logging.log_interval_secs)?;
        if self.logging.alert_tail_lines > MAX_ALERT_TAIL_LINES {
            return Err(ConfigError::ValidationError(format!(
                "alert_tail_lines must be <= {MAX_ALERT_TAIL_LINES}"
            )));
        }

        if self.relay.start_line == self.relay.stop_line {
            return Err(ConfigError::ValidationError(format!(
                "start and stop relays share line {}",
                self.relay.start_line
            )));
        }
        if self.relay.gpio_chip.is_empty() {
            return Err(ConfigError::ValidationError(
                "gpio_chip cannot be empty".to_string(),
            ));
        }

        if let Some(smtp) = &self.smtp {
            if smtp.host.is_empty() {
                return Err(ConfigError::ValidationError(
                    "smtp.host cannot be empty".to_string(),
                ));
            }
            if smtp.recipients.is_empty() {
                return Err(ConfigError::ValidationError(
                    "smtp configured without recipients".to_string(),
                ));
            }
            if smtp.from.is_empty() {
                return Err(ConfigError::ValidationError(
                    "smtp.from cannot be empty".to_string(),
                ));
            }
        }

        let sim = &self.simulation;
        if !(sim.min_voltage < sim.max_voltage) || !(sim.time_scale > 0.0) {
            return Err(ConfigError::ValidationError(
                "simulation requires min_voltage < max_voltage and time_scale > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<T, G>(get: &G, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::ParseError(format!("{key}={raw:?}: {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ParseError(format!(
            "{key}={raw:?}: expected a boolean"
        ))),
    }
}

fn parse_address(key: &str, raw: &str) -> Result<u16, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| ConfigError::ParseError(format!("{key}={raw:?}: {e}")))
}
