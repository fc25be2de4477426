//! Print-job progress and hardware component state.

use heapless::String;
use serde::Serialize;

use crate::config::PrintDefaults;

/// Filename placeholder before a job has been started.
pub const NO_FILENAME: &str = "no file name";

/// Progress record of the current (or last) print job.
#[derive(Debug, Clone, Serialize)]
pub struct PrintJob {
    /// Name of the job file being exposed.
    pub filename: String<64>,
    /// Total scanlines in the job (facets per lane times lanes).
    pub total_lines: u32,
    /// Last scanline checkpoint reached.
    pub current_line: u32,
    /// Seconds since the job started, updated at checkpoints.
    pub printing_time_s: u32,
    /// Laser driver current for this job.
    pub laser_power: u8,
    /// Times each scanline is exposed.
    pub exposures_per_line: u16,
    /// Exposing on every 4th mirror facet only.
    pub single_facet: bool,
}

impl PrintJob {
    /// Fresh job record from the configured defaults.
    pub fn from_defaults(defaults: &PrintDefaults) -> Self {
        Self {
            filename: String::try_from(NO_FILENAME).unwrap_or_default(),
            total_lines: 0,
            current_line: 0,
            printing_time_s: 0,
            laser_power: defaults.laser_power,
            exposures_per_line: defaults.exposures_per_line,
            single_facet: defaults.single_facet,
        }
    }
}

/// Hardware component flags, independent of the job lifecycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ComponentState {
    /// A laser channel is on.
    pub laser: bool,
    /// The polygon mirror is spinning.
    pub rotating: bool,
    /// Last diode self-test outcome; `None` until a test ran.
    pub diode_test: Option<bool>,
}

/// Complete observable machine state.
///
/// Mutated only by the executor; observers read it after a notification.
#[derive(Debug, Clone, Serialize)]
pub struct MachineState {
    /// A job is currently printing (or paused mid-print).
    pub printing: bool,
    /// The pause toggle is engaged.
    pub paused: bool,
    /// Job progress record.
    pub job: PrintJob,
    /// Component flags.
    pub components: ComponentState,
}

impl MachineState {
    /// Fresh state from the configured defaults.
    pub fn from_defaults(defaults: &PrintDefaults) -> Self {
        Self {
            printing: false,
            paused: false,
            job: PrintJob::from_defaults(defaults),
            components: ComponentState::default(),
        }
    }

    /// Reset job progress and component flags for a new job.
    pub fn reset(&mut self, defaults: &PrintDefaults) {
        self.printing = false;
        self.paused = false;
        self.job = PrintJob::from_defaults(defaults);
        self.components = ComponentState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_starts_from_defaults() {
        let defaults = PrintDefaults {
            laser_power: 110,
            exposures_per_line: 2,
            single_facet: true,
            ..PrintDefaults::default()
        };
        let job = PrintJob::from_defaults(&defaults);

        assert_eq!(job.filename.as_str(), NO_FILENAME);
        assert_eq!(job.laser_power, 110);
        assert_eq!(job.exposures_per_line, 2);
        assert!(job.single_facet);
        assert_eq!(job.current_line, 0);
    }

    #[test]
    fn test_reset_clears_progress() {
        let defaults = PrintDefaults::default();
        let mut state = MachineState::from_defaults(&defaults);
        state.printing = true;
        state.job.current_line = 42;
        state.components.diode_test = Some(true);

        state.reset(&defaults);

        assert!(!state.printing);
        assert_eq!(state.job.current_line, 0);
        assert_eq!(state.components.diode_test, None);
    }
}
