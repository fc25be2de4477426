//! No-hardware scan-engine backend.

use log::debug;

use crate::error::Result;

use super::{Components, FpgaFlags, FpgaHost};

/// In-memory scan engine for bring-up without hardware.
///
/// Tracks component state and position, accepts every command, and triggers
/// the simulated photodiode whenever a laser runs against the spinning
/// polygon, so the diode self-test passes the way it does on a healthy
/// machine.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    components: Components,
    steppers_enabled: bool,
    position: [f32; 3],
    laser_current: u8,
    photodiode_trigger: bool,
    error: bool,
    lines_accepted: u32,
    commands_accepted: u32,
    resets: u32,
}

impl SimulatedHost {
    /// Create a simulated engine in the powered-down state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current component flags.
    pub fn components(&self) -> Components {
        self.components
    }

    /// Whether the steppers are energized.
    pub fn steppers_enabled(&self) -> bool {
        self.steppers_enabled
    }

    /// Current position in mm.
    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    /// Last laser current written.
    pub fn laser_current(&self) -> u8 {
        self.laser_current
    }

    /// Scanlines accepted since construction.
    pub fn lines_accepted(&self) -> u32 {
        self.lines_accepted
    }

    /// Raw command blocks accepted since construction.
    pub fn commands_accepted(&self) -> u32 {
        self.commands_accepted
    }

    /// Link resets seen since construction.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Force the photodiode flag, e.g. to simulate a stale trigger.
    pub fn set_photodiode_trigger(&mut self, triggered: bool) {
        self.photodiode_trigger = triggered;
    }

    /// Force the engine error flag.
    pub fn set_error(&mut self, error: bool) {
        self.error = error;
    }
}

impl FpgaHost for SimulatedHost {
    fn enable_comp(&mut self, components: Components) -> Result<()> {
        debug!("sim enable_comp {:?}", components);
        self.components = components;
        if (components.laser0 || components.laser1) && components.polygon {
            self.photodiode_trigger = true;
        }
        Ok(())
    }

    fn enable_steppers(&mut self, enabled: bool) -> Result<()> {
        self.steppers_enabled = enabled;
        Ok(())
    }

    fn home_axes(&mut self, axes: [bool; 3]) -> Result<()> {
        for (position, home) in self.position.iter_mut().zip(axes) {
            if home {
                *position = 0.0;
            }
        }
        Ok(())
    }

    fn goto_point(&mut self, vector: [f32; 3], absolute: bool) -> Result<()> {
        if absolute {
            self.position = vector;
        } else {
            for (position, delta) in self.position.iter_mut().zip(vector) {
                *position += delta;
            }
        }
        Ok(())
    }

    fn send_command(&mut self, data: &[u8]) -> Result<()> {
        debug!("sim accepted {} command bytes", data.len());
        self.commands_accepted += 1;
        Ok(())
    }

    fn write_line(&mut self, words: &[u8]) -> Result<()> {
        if words.is_empty() {
            debug!("sim accepted stop line");
        }
        self.lines_accepted += 1;
        Ok(())
    }

    fn set_laser_current(&mut self, value: u8) -> Result<()> {
        self.laser_current = value;
        Ok(())
    }

    fn state(&mut self) -> Result<FpgaFlags> {
        Ok(FpgaFlags {
            photodiode_trigger: self.photodiode_trigger,
            error: self.error,
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        self.components = Components::default();
        self.photodiode_trigger = false;
        self.error = false;
        Ok(())
    }
}
