//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::print::{LASER_POWER_MAX, LASER_POWER_MIN};
use super::SystemConfig;

/// Validate a system configuration.
///
/// Checks:
/// - Laser power stays within the diode driver's range
/// - Exposure count and scan geometry are non-degenerate
/// - UART link parameters are usable
/// - Driver current fields fit their register encodings
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    validate_print(config)?;
    validate_uart(config)?;
    validate_driver(config)?;
    validate_scanner(config)?;
    Ok(())
}

fn validate_print(config: &SystemConfig) -> Result<()> {
    let print = &config.print;

    if !(LASER_POWER_MIN..=LASER_POWER_MAX).contains(&print.laser_power) {
        return Err(Error::Config(ConfigError::InvalidLaserPower(
            print.laser_power,
        )));
    }

    if print.exposures_per_line == 0 {
        return Err(Error::Config(ConfigError::InvalidExposures(
            print.exposures_per_line,
        )));
    }

    Ok(())
}

fn validate_uart(config: &SystemConfig) -> Result<()> {
    let uart = &config.uart;

    if uart.baud_rate == 0 {
        return Err(Error::Config(ConfigError::InvalidBaudRate(uart.baud_rate)));
    }

    // The bus protocol reserves two address bits
    if uart.node_address > 3 {
        return Err(Error::Config(ConfigError::InvalidNodeAddress(
            uart.node_address,
        )));
    }

    Ok(())
}

fn validate_driver(config: &SystemConfig) -> Result<()> {
    let driver = &config.driver;

    if driver.hold_multiplier <= 0.0 || driver.hold_multiplier > 1.0 {
        return Err(Error::Config(ConfigError::InvalidHoldMultiplier(
            driver.hold_multiplier,
        )));
    }

    if driver.hold_delay > 15 {
        return Err(Error::Config(ConfigError::InvalidHoldDelay(
            driver.hold_delay,
        )));
    }

    if driver.rsense_ohms <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidSenseResistor(
            driver.rsense_ohms,
        )));
    }

    if driver.vref <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidVref(driver.vref)));
    }

    Ok(())
}

fn validate_scanner(config: &SystemConfig) -> Result<()> {
    let scanner = &config.scanner;

    if scanner.rpm == 0 {
        return Err(Error::Config(ConfigError::InvalidRpm(scanner.rpm)));
    }

    if scanner.words_per_line == 0 {
        return Err(Error::Config(ConfigError::InvalidWordsPerLine(
            scanner.words_per_line,
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_laser_power() {
        let mut config = SystemConfig::default();
        config.print.laser_power = 30;

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidLaserPower(30)))
        ));
    }

    #[test]
    fn test_invalid_hold_multiplier() {
        let mut config = SystemConfig::default();
        config.driver.hold_multiplier = 1.5;

        let result = validate_config(&config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidHoldMultiplier(_)))
        ));
    }
}
