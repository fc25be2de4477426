//! Unit tests for configuration validation.

use scanhead_control::error::{ConfigError, Error};
use scanhead_control::{validate_config, SystemConfig};

fn assert_config_error(config: &SystemConfig, expected: fn(&ConfigError) -> bool) {
    match validate_config(config) {
        Err(Error::Config(e)) if expected(&e) => {}
        other => panic!("unexpected validation result: {:?}", other),
    }
}

#[test]
fn test_laser_power_bounds_are_inclusive() {
    let mut config = SystemConfig::default();

    config.print.laser_power = 50;
    assert!(validate_config(&config).is_ok());

    config.print.laser_power = 150;
    assert!(validate_config(&config).is_ok());

    config.print.laser_power = 49;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidLaserPower(49)));

    config.print.laser_power = 151;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidLaserPower(151)));
}

#[test]
fn test_exposures_must_be_positive() {
    let mut config = SystemConfig::default();
    config.print.exposures_per_line = 0;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidExposures(0)));
}

#[test]
fn test_rpm_must_be_positive() {
    let mut config = SystemConfig::default();
    config.scanner.rpm = 0;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidRpm(0)));
}

#[test]
fn test_words_per_line_must_be_positive() {
    let mut config = SystemConfig::default();
    config.scanner.words_per_line = 0;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidWordsPerLine(0)));
}

#[test]
fn test_node_address_fits_bus() {
    let mut config = SystemConfig::default();
    config.uart.node_address = 4;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidNodeAddress(4)));
}

#[test]
fn test_baud_rate_must_be_positive() {
    let mut config = SystemConfig::default();
    config.uart.baud_rate = 0;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidBaudRate(0)));
}

#[test]
fn test_hold_fields_fit_registers() {
    let mut config = SystemConfig::default();
    config.driver.hold_multiplier = 0.0;
    assert_config_error(&config, |e| {
        matches!(e, ConfigError::InvalidHoldMultiplier(_))
    });

    let mut config = SystemConfig::default();
    config.driver.hold_delay = 16;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidHoldDelay(16)));
}

#[test]
fn test_electrical_values_must_be_positive() {
    let mut config = SystemConfig::default();
    config.driver.rsense_ohms = 0.0;
    assert_config_error(&config, |e| {
        matches!(e, ConfigError::InvalidSenseResistor(_))
    });

    let mut config = SystemConfig::default();
    config.driver.vref = -1.0;
    assert_config_error(&config, |e| matches!(e, ConfigError::InvalidVref(_)));
}
