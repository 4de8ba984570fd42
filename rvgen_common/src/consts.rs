//! System-wide constants for the rvgen workspace.
//!
//! Single source of truth for defaults and limits. The controller defaults
//! mirror the values the generator has been field-tuned with.

use static_assertions::const_assert;

/// Default service name (log records, notification sender).
pub const DEFAULT_SERVICE_NAME: &str = "rv-generator";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rvgen/rvgen.toml";

/// Default operator event log path.
pub const DEFAULT_LOG_FILE: &str = "/var/log/rv-generator.log";

/// Battery voltage below which a start is requested (V).
pub const DEFAULT_VOLTAGE_START: f64 = 12.0;

/// Battery voltage at or above which a running generator may be stopped (V).
pub const DEFAULT_VOLTAGE_STOP: f64 = 13.6;

/// Voltage rise required to confirm a start attempt (V).
pub const DEFAULT_VOLTAGE_RISE_CONFIRM: f64 = 0.3;

/// Margin above `voltage_start` that counts as "detected running" when rise
/// confirmation is disabled (V).
pub const DEFAULT_DETECT_MARGIN: f64 = 0.5;

/// Start relay hold time (s).
pub const DEFAULT_START_PULSE_SECS: f64 = 2.0;

/// Stop relay hold time (s).
pub const DEFAULT_STOP_PULSE_SECS: f64 = 2.0;

/// Minimum generator run time before a stop is considered (s).
pub const DEFAULT_MIN_RUN_SECS: f64 = 1800.0;

/// Delay between a start pulse and the confirmation sample (s).
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 60.0;

/// Consecutive failed start attempts before giving up for the episode.
pub const DEFAULT_MAX_START_ATTEMPTS: u32 = 3;

/// Bus-voltage sampling interval (s).
pub const DEFAULT_VOLTAGE_SAMPLE_SECS: f64 = 5.0;

/// Temperature sampling interval (s).
pub const DEFAULT_TEMP_SAMPLE_SECS: f64 = 60.0;

/// Status line interval (s).
pub const DEFAULT_LOG_INTERVAL_SECS: f64 = 30.0;

/// Upper bound for any configured duration (s), one year. Keeps deadline
/// arithmetic on `Instant` far from overflow.
pub const MAX_DURATION_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// Event-log lines attached to alert notifications.
pub const DEFAULT_ALERT_TAIL_LINES: usize = 20;

/// Capacity of the in-memory event-log tail.
pub const MAX_ALERT_TAIL_LINES: usize = 64;

/// Default I2C bus number (`/dev/i2c-1`).
pub const DEFAULT_I2C_BUS: u8 = 1;

/// Default INA226 slave address.
pub const DEFAULT_INA226_ADDR: u16 = 0x40;

/// Default GPIO chip holding the relay lines.
pub const DEFAULT_GPIO_CHIP: &str = "gpiochip0";

/// Default start relay line offset.
pub const DEFAULT_RELAY_START_LINE: u32 = 5;

/// Default stop relay line offset.
pub const DEFAULT_RELAY_STOP_LINE: u32 = 6;

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

const_assert!(DEFAULT_VOLTAGE_START < DEFAULT_VOLTAGE_STOP);
const_assert!(DEFAULT_MAX_START_ATTEMPTS > 0);
const_assert!(DEFAULT_ALERT_TAIL_LINES <= MAX_ALERT_TAIL_LINES);
const_assert!(DEFAULT_RELAY_START_LINE != DEFAULT_RELAY_STOP_LINE);
