//! DS18B20 1-Wire sysfs record parsing.
//!
//! The `w1_therm` kernel driver exposes each probe as a two-line `w1_slave`
//! file:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line carries the CRC verdict, the second the temperature in
//! millidegrees Celsius.

/// Parse a `w1_slave` record into degrees Celsius.
///
/// Returns `None` on a CRC failure or a malformed record.
pub fn parse_w1_slave(record: &str) -> Option<f64> {
    let mut lines = record.lines();
    let crc_line = lines.next()?;
    if !crc_line.trim_end().ends_with("YES") {
        return None;
    }
    let data_line = lines.next()?;
    let (_, raw) = data_line.rsplit_once("t=")?;
    let millis: i32 = raw.trim().parse().ok()?;
    Some(f64::from(millis) / 1000.0)
}

/// Degrees Celsius to degrees Fahrenheit.
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
