//! Default print-job settings.

use heapless::String;
use serde::Deserialize;

/// Lowest laser power the diode driver accepts.
pub const LASER_POWER_MIN: u8 = 50;

/// Highest laser power the diode driver accepts.
pub const LASER_POWER_MAX: u8 = 150;

/// Defaults applied to every new print job.
///
/// A job starts from these values; the executor owns the live copy inside
/// [`crate::job::PrintJob`] afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintDefaults {
    /// Laser driver current setting (50-150).
    #[serde(default = "default_laser_power")]
    pub laser_power: u8,

    /// Number of times each scanline is exposed (>= 1).
    #[serde(default = "default_exposures")]
    pub exposures_per_line: u16,

    /// Expose on every 4th mirror facet only.
    #[serde(default)]
    pub single_facet: bool,

    /// Directory holding uploaded job files (max 64 chars).
    #[serde(default = "default_job_folder")]
    pub job_folder: String<64>,
}

fn default_laser_power() -> u8 {
    130
}

fn default_exposures() -> u16 {
    1
}

fn default_job_folder() -> String<64> {
    String::try_from("sd/jobs").unwrap_or_default()
}

impl Default for PrintDefaults {
    fn default() -> Self {
        Self {
            laser_power: default_laser_power(),
            exposures_per_line: default_exposures(),
            single_facet: false,
            job_folder: default_job_folder(),
        }
    }
}
