//! Relay lines on sysfs GPIO.
//!
//! Lines are addressed as `<chip base> + <offset>`. Each write opens the
//! line's `value` file, so every method works from any thread without a lock.

use rvgen_common::hal::config::RelaySettings;
use rvgen_common::hal::driver::{HalError, RelayActuator, RelayLine};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use sysfs_gpio::{Direction, Pin};
use tracing::{info, warn};

const SYSFS_GPIO: &str = "/sys/class/gpio";
const SYSFS_GPIO_DEVICES: &str = "/sys/bus/gpio/devices";

/// udev may need a moment to fix permissions on a freshly exported line.
const EXPORT_SETTLE_RETRIES: u32 = 10;
const EXPORT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Start/stop relays, active-high, driven low on acquisition.
#[derive(Debug)]
pub struct SysfsRelay {
    start: Pin,
    stop: Pin,
}

impl SysfsRelay {
    /// Export both lines as outputs driven low.
    pub fn open(settings: &RelaySettings) -> Result<Self, HalError> {
        let base = chip_base(&settings.gpio_chip)?;
        let start = acquire(RelayLine::Start, global_line(base, settings.start_line)?)?;
        let stop_gpio = match global_line(base, settings.stop_line) {
            Ok(gpio) => gpio,
            Err(e) => {
                let _ = start.unexport();
                return Err(e);
            }
        };
        let stop = match acquire(RelayLine::Stop, stop_gpio) {
            Ok(pin) => pin,
            Err(e) => {
                let _ = start.set_value(0);
                let _ = start.unexport();
                return Err(e);
            }
        };

        info!(
            "Relays on {} (base {base}): start=GPIO{} stop=GPIO{}",
            settings.gpio_chip,
            start.get_pin_num(),
            stop.get_pin_num()
        );
        Ok(Self { start, stop })
    }

    fn pin(&self, line: RelayLine) -> Pin {
        match line {
            RelayLine::Start => self.start,
            RelayLine::Stop => self.stop,
        }
    }

    /// Drive every line low and unexport it.
    pub fn release_lines(&self) -> Result<(), HalError> {
        let mut first_err = self.force_all_inactive().err();
        for line in RelayLine::ALL {
            if let Err(e) = self.pin(line).unexport() {
                warn!("Failed to unexport {line} relay line: {e}");
                first_err.get_or_insert(actuator_error(line, e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl RelayActuator for SysfsRelay {
    fn name(&self) -> &'static str {
        "sysfs_gpio"
    }

    fn set_line(&self, line: RelayLine, active: bool) -> Result<(), HalError> {
        self.pin(line)
            .set_value(u8::from(active))
            .map_err(|e| actuator_error(line, e))
    }

    fn is_active(&self, line: RelayLine) -> Result<bool, HalError> {
        self.pin(line)
            .get_value()
            .map(|v| v != 0)
            .map_err(|e| actuator_error(line, e))
    }

    fn release(&self) -> Result<(), HalError> {
        self.release_lines()
    }
}

fn actuator_error(line: RelayLine, e: sysfs_gpio::Error) -> HalError {
    HalError::ActuatorError {
        line,
        reason: e.to_string(),
    }
}

/// Global sysfs number of `offset` on a chip starting at `base`.
fn global_line(base: u32, offset: u32) -> Result<u32, HalError> {
    base.checked_add(offset).ok_or_else(|| {
        HalError::InitFailed(format!("GPIO line offset {offset} out of range for base {base}"))
    })
}

fn acquire(line: RelayLine, gpio: u32) -> Result<Pin, HalError> {
    let pin = Pin::new(u64::from(gpio));
    pin.export().map_err(|e| actuator_error(line, e))?;

    let mut attempt = 0;
    loop {
        match pin.set_direction(Direction::Low) {
            Ok(()) => return Ok(pin),
            Err(_) if attempt < EXPORT_SETTLE_RETRIES => {
                attempt += 1;
                thread::sleep(EXPORT_SETTLE_DELAY);
            }
            Err(e) => return Err(actuator_error(line, e)),
        }
    }
}

/// First sysfs GPIO number of `chip`.
///
/// On older kernels the sysfs directory is named after the chip. Newer ones
/// number sysfs chips by base (`gpiochip512`), so the character-device name is
/// resolved through the device tree instead.
fn chip_base(chip: &str) -> Result<u32, HalError> {
    if let Some(base) = read_base(&Path::new(SYSFS_GPIO).join(chip)) {
        return Ok(base);
    }

    let device = fs::canonicalize(Path::new(SYSFS_GPIO_DEVICES).join(chip))
        .map_err(|e| HalError::InitFailed(format!("GPIO chip {chip} not found: {e}")))?;
    let sysfs_dir: PathBuf = device
        .parent()
        .map(|p| p.join("gpio"))
        .ok_or_else(|| HalError::InitFailed(format!("GPIO chip {chip} has no parent device")))?;
    let entries = fs::read_dir(&sysfs_dir)
        .map_err(|e| HalError::InitFailed(format!("{}: {e}", sysfs_dir.display())))?;

    entries
        .filter_map(Result::ok)
        .find_map(|entry| read_base(&entry.path()))
        .ok_or_else(|| HalError::InitFailed(format!("no sysfs base found for GPIO chip {chip}")))
}

fn read_base(chip_dir: &Path) -> Option<u32> {
    fs::read_to_string(chip_dir.join("base"))
        .ok()?
        .trim()
        .parse()
        .ok()
}
