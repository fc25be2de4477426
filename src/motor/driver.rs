//! Stepper-driver register facade.
//!
//! Maps named configuration fields onto register bit fields through a
//! [`RegisterBus`], so the same facade runs over the real UART transport or
//! a test double.

use libm::roundf;
use log::{debug, info, warn};

use crate::config::units::{Microsteps, Milliamps};
use crate::config::DriverConfig;
use crate::error::Result;
use crate::transport::RegisterBus;

use super::registers::{
    chopconf, drvstatus, gconf, gstat, ihold_irun, CHOPCONF, DRVSTATUS, GCONF, GSTAT, IFCNT,
    IHOLD_IRUN, MSCNT, SGTHRS, SG_RESULT, TCOOLTHRS, TSTEP,
};

/// Base full steps per revolution of a 1.8 degree motor.
const FULL_STEPS_PER_REV: u32 = 200;

/// Liveness snapshot of the driver chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverProbe {
    /// Interface transmission counter value.
    pub ifcnt: u32,
    /// Global status flags.
    pub gstat: u32,
}

/// Decoded driver status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverStatus {
    /// Motor is standing still.
    pub standstill: bool,
    /// Chopper is currently in the quiet stealth mode.
    pub stealth: bool,
    /// Actual current scale in use (0-31).
    pub current_scale: u8,
    /// Driver shut down on overtemperature.
    pub overtemperature: bool,
    /// Overtemperature prewarning.
    pub overtemperature_warning: bool,
    /// Open load detected on phase A.
    pub open_load_a: bool,
    /// Open load detected on phase B.
    pub open_load_b: bool,
    /// Short circuit detected on phase A.
    pub short_a: bool,
    /// Short circuit detected on phase B.
    pub short_b: bool,
}

/// Named-field access to the motor-driver chip configuration.
///
/// Generic over the register bus so hardware and tests share one code path.
pub struct StepperDriver<B> {
    bus: B,
    steps_per_revolution: u32,
}

impl<B: RegisterBus> StepperDriver<B> {
    /// Create a facade over a register bus.
    ///
    /// Call [`StepperDriver::init`] before relying on cached values.
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            steps_per_revolution: 0,
        }
    }

    /// Bring-up: cache the steps-per-revolution, clear latched status flags
    /// and drop stale receive bytes.
    pub fn init(&mut self) -> Result<()> {
        self.refresh_steps_per_revolution()?;
        self.clear_gstat()?;
        self.bus.flush_rx();
        Ok(())
    }

    /// Access the underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the underlying bus.
    pub fn free(self) -> B {
        self.bus
    }

    fn flag(&mut self, reg: u8, mask: u32) -> Result<bool> {
        Ok(self.bus.read_u32(reg)? & mask != 0)
    }

    fn set_flag(&mut self, reg: u8, mask: u32, on: bool) -> Result<bool> {
        self.bus.update_bits(reg, mask, if on { mask } else { 0 })
    }

    /// Whether the motor shaft direction is inverted.
    pub fn direction_inverted(&mut self) -> Result<bool> {
        self.flag(GCONF, gconf::SHAFT)
    }

    /// Invert or restore the motor shaft direction.
    pub fn set_direction_inverted(&mut self, inverted: bool) -> Result<bool> {
        info!(
            "writing {} motor direction",
            if inverted { "inverse" } else { "normal" }
        );
        self.set_flag(GCONF, gconf::SHAFT, inverted)
    }

    /// Whether VREF is used as the current reference.
    pub fn analog_current_scale(&mut self) -> Result<bool> {
        self.flag(GCONF, gconf::I_SCALE_ANALOG)
    }

    /// Select VREF (true) or the internal reference (false).
    pub fn set_analog_current_scale(&mut self, enabled: bool) -> Result<bool> {
        self.set_flag(GCONF, gconf::I_SCALE_ANALOG, enabled)
    }

    /// Whether the internal sense resistors are selected.
    pub fn internal_sense(&mut self) -> Result<bool> {
        self.flag(GCONF, gconf::INTERNAL_RSENSE)
    }

    /// Select internal (true) or external (false) sense resistors.
    pub fn set_internal_sense(&mut self, enabled: bool) -> Result<bool> {
        if enabled {
            warn!("internal sense resistors selected; check board support");
        }
        self.set_flag(GCONF, gconf::INTERNAL_RSENSE, enabled)
    }

    /// Whether the spread-cycle chopper is active.
    pub fn spread_cycle(&mut self) -> Result<bool> {
        self.flag(GCONF, gconf::EN_SPREADCYCLE)
    }

    /// Select the spread-cycle (true) or stealth (false) chopper.
    pub fn set_spread_cycle(&mut self, enabled: bool) -> Result<bool> {
        info!(
            "activated {}",
            if enabled { "spread-cycle" } else { "stealth chopper" }
        );
        self.set_flag(GCONF, gconf::EN_SPREADCYCLE, enabled)
    }

    /// Whether the low sense-voltage range is selected.
    pub fn vsense(&mut self) -> Result<bool> {
        self.flag(CHOPCONF, chopconf::VSENSE)
    }

    /// Select the high-sensitivity, low sense-voltage range.
    pub fn set_vsense(&mut self, enabled: bool) -> Result<bool> {
        self.set_flag(CHOPCONF, chopconf::VSENSE, enabled)
    }

    /// Whether microstep interpolation is active.
    pub fn interpolation(&mut self) -> Result<bool> {
        self.flag(CHOPCONF, chopconf::INTPOL)
    }

    /// Interpolate microsteps to 256 internally.
    pub fn set_interpolation(&mut self, enabled: bool) -> Result<bool> {
        info!("writing microstep interpolation setting: {}", enabled);
        self.set_flag(CHOPCONF, chopconf::INTPOL, enabled)
    }

    /// Read the native microstep resolution from the chip.
    pub fn microstep_resolution(&mut self) -> Result<Microsteps> {
        let value = self.bus.read_u32(CHOPCONF)?;
        let code = ((value & chopconf::MSRES_MASK) >> chopconf::MSRES_SHIFT) as u8;
        let resolution = Microsteps::from_encoded(code)?;
        self.steps_per_revolution = FULL_STEPS_PER_REV * u32::from(resolution.value());
        Ok(resolution)
    }

    /// Write the microstep resolution and select register control for it.
    ///
    /// The companion `mstep_reg_select` bit must be set or the chip keeps
    /// following its MS pins and the written value has no effect.
    pub fn set_microstep_resolution(&mut self, resolution: Microsteps) -> Result<bool> {
        info!("writing {} microstep setting", resolution.value());
        let written = self.bus.update_bits(
            CHOPCONF,
            chopconf::MSRES_MASK,
            u32::from(resolution.encoded()) << chopconf::MSRES_SHIFT,
        )?;
        let selected = self.set_flag(GCONF, gconf::MSTEP_REG_SELECT, true)?;
        self.steps_per_revolution = FULL_STEPS_PER_REV * u32::from(resolution.value());
        Ok(written && selected)
    }

    /// Microsteps needed for one shaft revolution, from the cached
    /// resolution.
    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    /// Re-read the resolution from the chip and return the derived
    /// steps per revolution.
    pub fn refresh_steps_per_revolution(&mut self) -> Result<u32> {
        self.microstep_resolution()?;
        Ok(self.steps_per_revolution)
    }

    /// Pack hold/run current scales and the hold delay into one register
    /// write. All fields are clamped to their register widths.
    pub fn set_hold_run_current(&mut self, ihold: u8, irun: u8, hold_delay: u8) -> bool {
        let packed = (u32::from(ihold & 0x1F) << ihold_irun::IHOLD_SHIFT)
            | (u32::from(irun & 0x1F) << ihold_irun::IRUN_SHIFT)
            | (u32::from(hold_delay & 0x0F) << ihold_irun::IHOLDDELAY_SHIFT);
        info!("writing hold/run current 0x{:08X}", packed);
        self.bus.write_checked(IHOLD_IRUN, packed)
    }

    /// Derive current scales from a run current in mA and write them.
    ///
    /// The scale depends on the vsense range currently selected on the chip,
    /// the sense resistor and the reference voltage from configuration; the
    /// hold current is a configured fraction of the run scale.
    pub fn set_current(&mut self, run_current: Milliamps, config: &DriverConfig) -> Result<bool> {
        let vsense = self.vsense()?;
        let scale = current_scale(run_current, config.rsense_ohms, config.vref, vsense);
        let irun = roundf(scale) as u8;
        let ihold = roundf(config.hold_multiplier * scale) as u8;
        debug!(
            "run current {} mA -> scale {} (hold {})",
            run_current.value(),
            irun,
            ihold
        );
        Ok(self.set_hold_run_current(ihold, irun, config.hold_delay))
    }

    /// Clear the latched reset and driver-error flags.
    pub fn clear_gstat(&mut self) -> Result<bool> {
        let value = self.bus.read_u32(GSTAT)?;
        Ok(self
            .bus
            .write_checked(GSTAT, value | gstat::RESET | gstat::DRV_ERR))
    }

    /// Quick liveness check: counter and status flags, or `None` when the
    /// chip does not answer. Meant for health reporting, not hot paths.
    pub fn probe(&mut self) -> Option<DriverProbe> {
        let ifcnt = self.bus.read_u32(IFCNT).ok()?;
        let gstat = self.bus.read_u32(GSTAT).ok()?;
        Some(DriverProbe { ifcnt, gstat })
    }

    /// Read and decode the driver status register.
    pub fn status(&mut self) -> Result<DriverStatus> {
        let value = self.bus.read_u32(DRVSTATUS)?;
        Ok(DriverStatus {
            standstill: value & drvstatus::STST != 0,
            stealth: value & drvstatus::STEALTH != 0,
            current_scale: ((value & drvstatus::CS_ACTUAL_MASK) >> drvstatus::CS_ACTUAL_SHIFT)
                as u8,
            overtemperature: value & drvstatus::OT != 0,
            overtemperature_warning: value & drvstatus::OTPW != 0,
            open_load_a: value & drvstatus::OLA != 0,
            open_load_b: value & drvstatus::OLB != 0,
            short_a: value & (drvstatus::S2GA | drvstatus::S2VSA) != 0,
            short_b: value & (drvstatus::S2GB | drvstatus::S2VSB) != 0,
        })
    }

    /// Current stall-detection load measurement; higher means less load.
    pub fn stallguard_result(&mut self) -> Result<u32> {
        self.bus.read_u32(SG_RESULT)
    }

    /// Set the stall-detection threshold.
    pub fn set_stallguard_threshold(&mut self, threshold: u8) -> bool {
        self.bus.write_checked(SGTHRS, u32::from(threshold))
    }

    /// Set the lower velocity threshold for the smart-energy features.
    pub fn set_coolstep_threshold(&mut self, threshold: u32) -> bool {
        self.bus.write_checked(TCOOLTHRS, threshold)
    }

    /// Measured time between steps.
    pub fn tstep(&mut self) -> Result<u32> {
        self.bus.read_u32(TSTEP)
    }

    /// Position in the microstep table.
    pub fn microstep_counter(&mut self) -> Result<u32> {
        self.bus.read_u32(MSCNT)
    }

    /// Push the configured electrical defaults to the chip.
    ///
    /// Unconfirmed writes are logged and bring-up continues; a transport
    /// failure aborts it.
    pub fn apply_config(&mut self, config: &DriverConfig) -> Result<()> {
        if !self.set_microstep_resolution(config.microsteps)? {
            warn!("microstep resolution write unconfirmed");
        }
        if !self.set_interpolation(config.interpolation)? {
            warn!("interpolation write unconfirmed");
        }
        if !self.set_spread_cycle(config.spread_cycle)? {
            warn!("chopper mode write unconfirmed");
        }
        if !self.set_current(config.run_current_ma, config)? {
            warn!("current write unconfirmed");
        }
        Ok(())
    }
}

/// Current scale for a run current in mA, clamped to the 5-bit field.
///
/// `CS = 32 * sqrt(2) * I / 1000 * (R_sense + 0.02) / V_fs - 1`, where the
/// full-scale voltage depends on the vsense range.
fn current_scale(run_current: Milliamps, rsense_ohms: f32, vref: f32, vsense: bool) -> f32 {
    let vfs = if vsense { 0.180 } else { 0.325 } * vref / 2.5;
    let scale = 32.0 * core::f32::consts::SQRT_2 * f32::from(run_current.value()) / 1000.0
        * (rsense_ohms + 0.02)
        / vfs
        - 1.0;
    scale.clamp(0.0, 31.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory register file; the counter advances on every write like the
    /// hardware one.
    struct FakeBus {
        regs: [u32; 0x80],
        ifcnt: u8,
    }

    impl FakeBus {
        fn new() -> Self {
            Self {
                regs: [0; 0x80],
                ifcnt: 0,
            }
        }
    }

    impl RegisterBus for FakeBus {
        fn read_u32(&mut self, reg: u8) -> Result<u32> {
            if reg == IFCNT {
                Ok(u32::from(self.ifcnt))
            } else {
                Ok(self.regs[reg as usize])
            }
        }

        fn write(&mut self, reg: u8, value: u32) -> Result<()> {
            self.regs[reg as usize] = value;
            self.ifcnt = self.ifcnt.wrapping_add(1);
            Ok(())
        }

        fn write_checked(&mut self, reg: u8, value: u32) -> bool {
            self.write(reg, value).is_ok()
        }
    }

    #[test]
    fn test_microstep_round_trip() {
        let mut driver = StepperDriver::new(FakeBus::new());
        for value in [1u16, 2, 4, 8, 16, 32, 64, 128, 256] {
            let resolution = Microsteps::new(value).unwrap();
            assert!(driver.set_microstep_resolution(resolution).unwrap());
            assert_eq!(driver.microstep_resolution().unwrap(), resolution);
            assert_eq!(driver.steps_per_revolution(), 200 * u32::from(value));
        }
    }

    #[test]
    fn test_set_resolution_asserts_register_select() {
        let mut driver = StepperDriver::new(FakeBus::new());
        driver
            .set_microstep_resolution(Microsteps::SIXTEENTH)
            .unwrap();
        let gconf_value = driver.bus_mut().read_u32(GCONF).unwrap();
        assert_ne!(gconf_value & gconf::MSTEP_REG_SELECT, 0);
    }

    #[test]
    fn test_direction_bit_preserves_neighbors() {
        let mut driver = StepperDriver::new(FakeBus::new());
        driver.set_spread_cycle(true).unwrap();
        driver.set_direction_inverted(true).unwrap();
        assert!(driver.spread_cycle().unwrap());
        assert!(driver.direction_inverted().unwrap());
        driver.set_direction_inverted(false).unwrap();
        assert!(driver.spread_cycle().unwrap());
        assert!(!driver.direction_inverted().unwrap());
    }

    #[test]
    fn test_current_packing() {
        let mut driver = StepperDriver::new(FakeBus::new());
        let config = DriverConfig::default();

        assert!(driver.set_current(Milliamps(600), &config).unwrap());

        // 600 mA over 0.11 ohm at vsense 0 gives scale 22, hold half of it
        let packed = driver.bus_mut().read_u32(IHOLD_IRUN).unwrap();
        assert_eq!(packed, 11 | (22 << 8) | (10 << 16));
    }

    #[test]
    fn test_current_clamps_to_field_width() {
        let mut driver = StepperDriver::new(FakeBus::new());
        let config = DriverConfig::default();

        driver.set_vsense(true).unwrap();
        assert!(driver.set_current(Milliamps(600), &config).unwrap());

        let packed = driver.bus_mut().read_u32(IHOLD_IRUN).unwrap();
        let irun = (packed >> 8) & 0x1F;
        assert_eq!(irun, 31);
    }

    #[test]
    fn test_clear_gstat_sets_clear_bits() {
        let mut driver = StepperDriver::new(FakeBus::new());
        assert!(driver.clear_gstat().unwrap());
        let value = driver.bus_mut().read_u32(GSTAT).unwrap();
        assert_eq!(value & (gstat::RESET | gstat::DRV_ERR), 0x3);
    }

    #[test]
    fn test_status_decode() {
        let mut driver = StepperDriver::new(FakeBus::new());
        let raw = drvstatus::STST | drvstatus::OTPW | (17 << drvstatus::CS_ACTUAL_SHIFT);
        driver.bus_mut().write(DRVSTATUS, raw).unwrap();

        let status = driver.status().unwrap();
        assert!(status.standstill);
        assert!(status.overtemperature_warning);
        assert!(!status.overtemperature);
        assert_eq!(status.current_scale, 17);
    }

    #[test]
    fn test_probe_reports_counter() {
        let mut driver = StepperDriver::new(FakeBus::new());
        driver.set_vsense(true).unwrap();
        let probe = driver.probe().unwrap();
        assert_eq!(probe.ifcnt, 1);
    }
}
