//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::SystemConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use scanhead_control::load_config;
///
/// let config = load_config("scanhead.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SystemConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    // Validate the configuration
    super::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config.print.laser_power, 130);
        assert_eq!(config.uart.baud_rate, 115_200);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[print]
laser_power = 110
exposures_per_line = 2
single_facet = true
job_folder = "sd/uploads"

[uart]
baud_rate = 230400
node_address = 1
retries = 5

[driver]
microsteps = 32
run_current_ma = 800

[scanner]
rpm = 4000
words_per_line = 98
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.print.laser_power, 110);
        assert!(config.print.single_facet);
        assert_eq!(config.uart.node_address, 1);
        assert_eq!(config.driver.microsteps.value(), 32);
        assert_eq!(config.scanner.rpm, 4000);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let toml = r#"
[print]
laser_power = 200
"#;
        assert!(parse_config(toml).is_err());
    }
}
