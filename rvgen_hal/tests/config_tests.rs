//! The shipped sample configuration must load and validate.

use rvgen_common::config::ConfigLoader;
use rvgen_common::hal::config::GeneratorConfig;
use rvgen_control::ControllerConfig;
use std::path::Path;

#[test]
fn sample_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/rvgen.toml");
    let config = GeneratorConfig::load(&path).expect("sample config parses");
    config.validate().expect("sample config validates");

    assert_eq!(config.control, GeneratorConfig::default().control);
    assert_eq!(config.sensor.ina226_addr, 0x40);
    assert!(config.smtp.is_none());

    let controller = ControllerConfig::from_settings(&config.control).unwrap();
    assert_eq!(controller, ControllerConfig::default());
}
