//! System configuration - root configuration structure.

use serde::Deserialize;

use super::driver::DriverConfig;
use super::print::PrintDefaults;
use super::scanner::ScannerConfig;
use super::uart::UartConfig;

/// Root configuration structure from TOML.
///
/// Every section is optional in the file; missing sections fall back to the
/// hardware defaults the device ships with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    /// Default print-job settings.
    #[serde(default)]
    pub print: PrintDefaults,

    /// Motor-driver UART link parameters.
    #[serde(default)]
    pub uart: UartConfig,

    /// Stepper-driver electrical configuration.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Scan-engine geometry and timing.
    #[serde(default)]
    pub scanner: ScannerConfig,
}
