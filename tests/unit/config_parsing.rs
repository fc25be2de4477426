//! Unit tests for TOML configuration parsing.

use scanhead_control::config::parse_config;
use scanhead_control::SystemConfig;

/// Test that an empty document yields the shipped defaults.
#[test]
fn test_defaults_without_sections() {
    let config = parse_config("").expect("empty config should parse");

    assert_eq!(config.print.laser_power, 130);
    assert_eq!(config.print.exposures_per_line, 1);
    assert!(!config.print.single_facet);
    assert_eq!(config.print.job_folder.as_str(), "sd/jobs");

    assert_eq!(config.uart.baud_rate, 115_200);
    assert_eq!(config.uart.node_address, 0);
    assert_eq!(config.uart.retries, 10);

    assert_eq!(config.driver.microsteps.value(), 16);
    assert_eq!(config.driver.run_current_ma.value(), 600);

    assert_eq!(config.scanner.rpm, 2000);
    assert_eq!(config.scanner.facets, 4);
    assert_eq!(config.scanner.start_offset, [70.0, 5.0, 0.0]);
}

/// Test parsing a fully populated configuration.
#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[print]
laser_power = 120
exposures_per_line = 4
single_facet = true
job_folder = "sd/uploads"

[uart]
baud_rate = 230400
node_address = 2
read_timeout_ms = 10
retries = 5

[driver]
microsteps = 64
run_current_ma = 750
hold_multiplier = 0.4
hold_delay = 8
rsense_ohms = 0.15
vref = 1.1
interpolation = false
spread_cycle = true

[scanner]
rpm = 4000
command_bytes = 1
word_bytes = 8
words_per_line = 98
facets = 4
start_offset = [60.0, 4.0, 0.0]
"#;

    let config = parse_config(toml_str).expect("full config should parse");

    assert_eq!(config.print.laser_power, 120);
    assert_eq!(config.print.exposures_per_line, 4);
    assert!(config.print.single_facet);

    assert_eq!(config.uart.baud_rate, 230_400);
    assert_eq!(config.uart.node_address, 2);
    assert_eq!(config.uart.read_timeout_ms, 10);

    assert_eq!(config.driver.microsteps.value(), 64);
    assert_eq!(config.driver.run_current_ma.value(), 750);
    assert!(!config.driver.interpolation);
    assert!(config.driver.spread_cycle);

    assert_eq!(config.scanner.rpm, 4000);
    assert_eq!(config.scanner.words_per_line, 98);
    assert_eq!(config.scanner.start_offset, [60.0, 4.0, 0.0]);
}

/// Test that the serde layer rejects invalid microstep divisors.
#[test]
fn test_parse_rejects_invalid_microsteps() {
    let toml_str = r#"
[driver]
microsteps = 24
"#;

    let result: Result<SystemConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

/// Test the derived UART timing parameters.
#[test]
fn test_uart_timing_derivation() {
    let config = parse_config(
        r#"
[uart]
baud_rate = 115200
read_timeout_ms = 20
"#,
    )
    .unwrap();

    // 500 bit times, floored at 0.5 ms
    assert_eq!(config.uart.pause_us(), 4340);
    // 3x the per-byte read timeout
    assert_eq!(config.uart.reply_timeout_us(), 60_000);
}

/// Test the checkpoint interval for the single-facet property.
#[test]
fn test_single_facet_checkpoint_interval() {
    let config = parse_config(
        r#"
[scanner]
rpm = 4000
"#,
    )
    .unwrap();

    assert_eq!(config.scanner.checkpoint_interval(2, true), 500);
    assert_eq!(config.scanner.checkpoint_interval(2, false), 2000);
}
