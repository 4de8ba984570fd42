//! INA226 register map and conversions.
//!
//! SMBus word transfers are little-endian while the INA226 sends the most
//! significant byte first, so every word crossing the bus is byte-swapped.

/// Configuration register.
pub const REG_CONFIG: u8 = 0x00;

/// Bus-voltage register.
pub const REG_BUS_VOLTAGE: u8 = 0x02;

/// Configuration word: 16-sample averaging, 1.1 ms conversions, continuous
/// shunt and bus conversion.
pub const CONFIG_CONTINUOUS_BUS: u16 = 0x4127;

/// Bus-voltage LSB in volts (1.25 mV).
pub const BUS_VOLTAGE_LSB: f64 = 0.00125;

/// Swap the two bytes of an SMBus word.
#[inline]
pub const fn swap16(word: u16) -> u16 {
    word.swap_bytes()
}

/// Convert a raw SMBus word read from [`REG_BUS_VOLTAGE`] into volts.
#[inline]
pub fn bus_voltage_from_word(word: u16) -> f64 {
    f64::from(swap16(word)) * BUS_VOLTAGE_LSB
}

/// Word to write to [`REG_CONFIG`] over SMBus.
#[inline]
pub const fn config_word() -> u16 {
    swap16(CONFIG_CONTINUOUS_BUS)
}
