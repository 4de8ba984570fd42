//! Generator runner and loop management.
//!
//! `GeneratorCore` owns the hardware handles, the controller and the operator
//! outputs, and drives them in a single loop:
//!
//! ```text
//! sample (when due) → tick → status line → execute effects → wait
//! ```
//!
//! Every wait, including the relay pulse hold, goes through the
//! [`ShutdownSignal`], so a termination request ends the loop at once.

use rvgen_common::config::ConfigError;
use rvgen_common::hal::config::GeneratorConfig;
use rvgen_common::hal::driver::{HalError, Hardware, RelayActuator, RelayLine};
use rvgen_control::{Cadence, ControllerConfig, Effect, EventKind, GeneratorController};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::driver_registry::DriverRegistry;
use crate::event_log::{EventLog, EventSink};
use crate::notify::{Notifier, NotifyError, alert_body, build_notifier};
use crate::shutdown::ShutdownSignal;

/// Runner state: controller, hardware and event outputs.
pub struct GeneratorCore {
    /// Validated configuration
    config: GeneratorConfig,
    /// Start/stop state machine
    controller: GeneratorController,
    /// Available drivers
    registry: DriverRegistry,
    /// Hardware handles, present between `init` and `shutdown`
    hardware: Option<Hardware>,
    /// Operator event log
    events: Box<dyn EventSink>,
    /// Alert channel, if configured
    notifier: Option<Box<dyn Notifier>>,
    /// Cancellation
    shutdown: ShutdownSignal,
    /// Battery status line cadence
    status: Cadence,
    /// Loop counters
    stats: LoopStats,
}

/// Loop counters for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Controller ticks executed.
    pub ticks: u64,
    /// Voltage reads that failed.
    pub voltage_read_failures: u64,
    /// Temperature reads that returned nothing.
    pub temperature_unavailable: u64,
    /// Relay pulses attempted.
    pub pulses: u64,
    /// Relay pulses that failed.
    pub actuator_faults: u64,
    /// Alerts delivered.
    pub alerts_sent: u64,
    /// Alerts that could not be delivered.
    pub alert_failures: u64,
}

impl GeneratorCore {
    /// Create a runner for a validated configuration.
    ///
    /// # Errors
    /// `HalError::ConfigError` if the configuration is invalid or the alert
    /// settings cannot be used. A notifier that is merely not compiled in is
    /// reported with `warn!` and alerts are only logged.
    pub fn new(config: GeneratorConfig, registry: DriverRegistry) -> Result<Self, HalError> {
        config.validate().map_err(config_error)?;
        let controller_config =
            ControllerConfig::from_settings(&config.control).map_err(config_error)?;

        let notifier = match build_notifier(&config) {
            Ok(notifier) => notifier,
            Err(NotifyError::Unsupported(reason)) => {
                warn!("Alerts will only be logged: {reason}");
                None
            }
            Err(e) => return Err(HalError::ConfigError(e.to_string())),
        };
        let status_interval = Duration::try_from_secs_f64(config.logging.log_interval_secs)
            .map_err(|e| HalError::ConfigError(format!("log_interval_secs: {e}")))?;

        info!(
            "GeneratorCore created: start < {:.2} V, stop >= {:.2} V, {} attempts, drivers {:?}",
            controller_config.voltage_start,
            controller_config.voltage_stop,
            controller_config.max_start_attempts,
            registry.list_drivers()
        );

        Ok(Self {
            events: Box::new(EventLog::new(&config.logging)),
            status: Cadence::new(status_interval),
            controller: GeneratorController::new(controller_config),
            config,
            registry,
            hardware: None,
            notifier,
            shutdown: ShutdownSignal::new(),
            stats: LoopStats::default(),
        })
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Replace the alert channel.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Open the named driver and drive every relay line inactive.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` for an unknown driver, the driver's own
    /// error if it cannot open its devices, or the relay error if the lines
    /// cannot be forced inactive.
    pub fn init(&mut self, driver_name: &str) -> Result<(), HalError> {
        if self.hardware.is_some() {
            return Err(HalError::InitFailed("driver already initialized".to_string()));
        }
        info!("Initializing GeneratorCore with driver '{}'...", driver_name);

        let hardware = self.registry.create(driver_name, &self.config)?;
        if let Err(e) = hardware.relay.force_all_inactive() {
            if let Err(release) = hardware.relay.release() {
                warn!("Failed to release relay lines after init error: {release}");
            }
            return Err(e);
        }
        if self.controller.temperature_enabled() && hardware.temperature.is_none() {
            warn!("Temperature trigger configured but driver '{driver_name}' has no probe");
        }
        info!("Created driver: {:?}", hardware);

        self.hardware = Some(hardware);
        self.events.record(&format!(
            "{} started (driver {driver_name})",
            self.config.shared.service_name
        ));
        Ok(())
    }

    /// Run the control loop until shutdown is requested.
    ///
    /// # Errors
    /// `HalError::InitFailed` if [`init`](Self::init) has not succeeded.
    /// Sensor and relay failures inside the loop are handled, not returned.
    pub fn run(&mut self) -> Result<(), HalError> {
        let mut hardware = self
            .hardware
            .take()
            .ok_or_else(|| HalError::InitFailed("Driver not initialized".to_string()))?;
        self.run_loop(&mut hardware);
        self.hardware = Some(hardware);
        Ok(())
    }

    fn run_loop(&mut self, hw: &mut Hardware) {
        let config = self.controller.config();
        info!(
            "Starting control loop (voltage every {:.1}s, status every {:.1}s)...",
            config.voltage_sample_interval.as_secs_f64(),
            self.status.interval().as_secs_f64()
        );

        while !self.shutdown.is_triggered() {
            let now = Instant::now();
            let request = self.controller.sample_request(now);
            let voltage = if request.voltage {
                self.read_voltage(hw)
            } else {
                None
            };
            let temperature = if request.temperature {
                self.read_temperature(hw)
            } else {
                None
            };

            let effects = self.controller.tick(now, voltage, temperature);
            self.stats.ticks += 1;
            self.log_status(now);
            self.execute(hw, effects);

            let now = Instant::now();
            let mut wake = self.controller.next_wakeup(now);
            if let Some(status_due) = self.status.next_due() {
                wake = wake.min(status_due.max(now));
            }
            self.shutdown.wait_timeout(wake.saturating_duration_since(now));
        }

        info!(
            "Control loop stopped after {} ticks (state {}, {} pulses, {} relay faults)",
            self.stats.ticks,
            self.controller.state().label(),
            self.stats.pulses,
            self.stats.actuator_faults
        );
    }

    fn read_voltage(&mut self, hw: &mut Hardware) -> Option<f64> {
        match hw.voltage.read_voltage() {
            Ok(v) => {
                trace!("voltage {v:.3} V");
                Some(v)
            }
            Err(e) => {
                self.stats.voltage_read_failures += 1;
                warn!("Voltage read failed: {e}");
                None
            }
        }
    }

    fn read_temperature(&mut self, hw: &mut Hardware) -> Option<f64> {
        let probe = hw.temperature.as_mut()?;
        let temperature = probe.read_temperature();
        if temperature.is_none() {
            self.stats.temperature_unavailable += 1;
            debug!("Temperature unavailable from {}", probe.name());
        }
        temperature
    }

    fn log_status(&mut self, now: Instant) {
        if !self.status.is_due(now) {
            return;
        }
        let Some(reading) = self.controller.reading() else {
            return;
        };
        self.status.mark(now);

        let line = match reading.temperature {
            Some(t) if self.controller.temperature_enabled() => format!(
                "Battery Voltage: {:.2} V, Temperature: {t:.1} °F",
                reading.voltage
            ),
            _ => format!("Battery Voltage: {:.2} V", reading.voltage),
        };
        self.events.record(&line);
        debug!("Controller state: {}", self.controller.state().label());
    }

    fn execute(&mut self, hw: &Hardware, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::PulseRelay { line, duration } => {
                    if self.shutdown.is_triggered() {
                        debug!("Shutdown pending; {line} pulse skipped");
                        continue;
                    }
                    queue.extend(self.pulse(hw.relay.as_ref(), line, duration));
                }
                Effect::SetAllInactive => {
                    if let Err(e) = hw.relay.force_all_inactive() {
                        error!("Failed to force relays inactive: {e}");
                    }
                }
                Effect::Emit { kind, message } => self.emit(kind, &message),
            }
        }
    }

    fn pulse(&mut self, relay: &dyn RelayActuator, line: RelayLine, hold: Duration) -> Vec<Effect> {
        debug!("Pulsing {line} relay for {:.1}s", hold.as_secs_f64());
        let shutdown = self.shutdown.clone();
        let result = relay.pulse(line, hold, &|d| {
            shutdown.wait_timeout(d);
        });

        self.stats.pulses += 1;
        if let Err(e) = &result {
            self.stats.actuator_faults += 1;
            error!("{line} relay pulse failed: {e}");
        }
        self.controller
            .pulse_finished(line, result.as_ref().map(|_| ()), Instant::now())
    }

    fn emit(&mut self, kind: EventKind, message: &str) {
        self.events.record(message);
        if !kind.is_alert() {
            return;
        }
        let Some(notifier) = &self.notifier else {
            return;
        };

        let subject = format!(
            "[{}] {}",
            self.config.shared.service_name,
            alert_subject(kind)
        );
        let body = alert_body(message, &self.events.recent());
        match notifier.notify(&subject, &body) {
            Ok(()) => {
                self.stats.alerts_sent += 1;
                debug!("Alert sent via {}: {subject}", notifier.name());
            }
            Err(e) => {
                self.stats.alert_failures += 1;
                warn!("{e}");
            }
        }
    }

    /// Drive every relay line inactive and release the hardware.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutdown requested");
        self.shutdown.trigger();

        let Some(hardware) = self.hardware.take() else {
            return Ok(());
        };
        if let Err(e) = hardware.relay.force_all_inactive() {
            error!("Failed to force relays inactive on shutdown: {e}");
        }
        let result = hardware.relay.release();
        self.events.record(&format!(
            "{} stopped, relays released",
            self.config.shared.service_name
        ));
        result
    }

    /// Handle for termination handlers and tests.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Relay handle usable from another thread, once initialized.
    pub fn relay_handle(&self) -> Option<Arc<dyn RelayActuator>> {
        self.hardware.as_ref().map(|hw| Arc::clone(&hw.relay))
    }

    /// The controller.
    pub fn controller(&self) -> &GeneratorController {
        &self.controller
    }

    /// Configuration in force.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Loop counters.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

fn config_error(e: ConfigError) -> HalError {
    HalError::ConfigError(e.to_string())
}

fn alert_subject(kind: EventKind) -> &'static str {
    match kind {
        EventKind::StartFailed => "Generator start failed",
        EventKind::MaxAttemptsReached => "Generator start attempts exhausted",
        EventKind::ActuatorFault => "Generator relay fault",
        other => other.label(),
    }
}
