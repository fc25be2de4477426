//! Stepper-driver chip electrical configuration.

use serde::Deserialize;

use super::units::{Microsteps, Milliamps};

/// Electrical defaults written to the motor-driver chip at bring-up.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Microstep divisor selected via the configuration register.
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Run current through the motor coils.
    #[serde(default = "default_run_current")]
    pub run_current_ma: Milliamps,

    /// Hold current as a fraction of the run current scale (0-1].
    #[serde(default = "default_hold_multiplier")]
    pub hold_multiplier: f32,

    /// Delay before dropping to hold current (4-bit register field, 0-15).
    #[serde(default = "default_hold_delay")]
    pub hold_delay: u8,

    /// External sense resistor in ohms.
    #[serde(default = "default_rsense")]
    pub rsense_ohms: f32,

    /// Current reference voltage in volts.
    #[serde(default = "default_vref")]
    pub vref: f32,

    /// Interpolate microsteps to 256 internally.
    #[serde(default = "default_true")]
    pub interpolation: bool,

    /// Use the spread-cycle chopper instead of the quiet default.
    #[serde(default)]
    pub spread_cycle: bool,
}

fn default_run_current() -> Milliamps {
    Milliamps(600)
}

fn default_hold_multiplier() -> f32 {
    0.5
}

fn default_hold_delay() -> u8 {
    10
}

fn default_rsense() -> f32 {
    0.11
}

fn default_vref() -> f32 {
    1.2
}

fn default_true() -> bool {
    true
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            microsteps: Microsteps::default(),
            run_current_ma: default_run_current(),
            hold_multiplier: default_hold_multiplier(),
            hold_delay: default_hold_delay(),
            rsense_ohms: default_rsense(),
            vref: default_vref(),
            interpolation: true,
            spread_cycle: false,
        }
    }
}
