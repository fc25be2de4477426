//! Motor-driver chip register map and bit fields.
//!
//! Register addresses plus per-register bit masks. `GSTAT.reset` and
//! `GSTAT.drv_err` are write-1-to-clear. The microstep resolution lives in
//! `CHOPCONF.msres[27:24]`, encoded as `8 - log2(divisor)`.

/// General configuration register.
pub const GCONF: u8 = 0x00;
/// Global status flags, write-1-to-clear.
pub const GSTAT: u8 = 0x01;
/// Interface transmission counter; increments on every accepted write.
pub const IFCNT: u8 = 0x02;
/// Pin state readback.
pub const IOIN: u8 = 0x06;
/// Run/hold current and hold delay.
pub const IHOLD_IRUN: u8 = 0x10;
/// Time between steps, measured by the chip.
pub const TSTEP: u8 = 0x12;
/// Lower velocity threshold for smart-energy features.
pub const TCOOLTHRS: u8 = 0x14;
/// Stall detection threshold.
pub const SGTHRS: u8 = 0x40;
/// Stall detection load measurement.
pub const SG_RESULT: u8 = 0x41;
/// Microstep table position counter.
pub const MSCNT: u8 = 0x6A;
/// Chopper configuration, including microstep resolution.
pub const CHOPCONF: u8 = 0x6C;
/// Driver status flags.
pub const DRVSTATUS: u8 = 0x6F;

/// GCONF bit fields.
pub mod gconf {
    /// Use VREF (1) vs internal reference (0) for current scale.
    pub const I_SCALE_ANALOG: u32 = 1 << 0;
    /// Use internal sense resistors; dangerous on most boards.
    pub const INTERNAL_RSENSE: u32 = 1 << 1;
    /// 1 = spread-cycle chopper, 0 = quiet stealth chopper.
    pub const EN_SPREADCYCLE: u32 = 1 << 2;
    /// Invert motor shaft direction.
    pub const SHAFT: u32 = 1 << 3;
    /// INDEX pin shows the overtemperature prewarning flag.
    pub const INDEX_OTPW: u32 = 1 << 4;
    /// INDEX pin outputs step pulses.
    pub const INDEX_STEP: u32 = 1 << 5;
    /// Microstep resolution from the register instead of the MS pins.
    pub const MSTEP_REG_SELECT: u32 = 1 << 7;
}

/// GSTAT bit fields.
pub mod gstat {
    /// Chip was reset since the last clear.
    pub const RESET: u32 = 1 << 0;
    /// Driver shut down on overtemperature or short circuit.
    pub const DRV_ERR: u32 = 1 << 1;
    /// Charge pump undervoltage (read-only).
    pub const UV_CP: u32 = 1 << 2;
}

/// CHOPCONF bit fields.
pub mod chopconf {
    /// High sensitivity, low sense resistor voltage.
    pub const VSENSE: u32 = 1 << 17;
    /// Microstep resolution field mask.
    pub const MSRES_MASK: u32 = 0xF << MSRES_SHIFT;
    /// Microstep resolution field shift.
    pub const MSRES_SHIFT: u32 = 24;
    /// Interpolate to 256 microsteps.
    pub const INTPOL: u32 = 1 << 28;
}

/// IOIN bit fields.
pub mod ioin {
    /// ENN pin level.
    pub const ENN: u32 = 1 << 0;
    /// STEP pin level.
    pub const STEP: u32 = 1 << 7;
    /// SPREAD pin level.
    pub const SPREAD: u32 = 1 << 8;
    /// DIR pin level.
    pub const DIR: u32 = 1 << 9;
}

/// IHOLD_IRUN bit fields.
pub mod ihold_irun {
    /// Hold current scale, bits [4:0].
    pub const IHOLD_SHIFT: u32 = 0;
    /// Run current scale, bits [12:8].
    pub const IRUN_SHIFT: u32 = 8;
    /// Hold-current delay, bits [19:16].
    pub const IHOLDDELAY_SHIFT: u32 = 16;
}

/// DRVSTATUS bit fields.
pub mod drvstatus {
    /// Motor is standing still.
    pub const STST: u32 = 1 << 31;
    /// Chopper currently in stealth mode.
    pub const STEALTH: u32 = 1 << 30;
    /// Actual current scale field shift.
    pub const CS_ACTUAL_SHIFT: u32 = 16;
    /// Actual current scale field mask (5 bits).
    pub const CS_ACTUAL_MASK: u32 = 0x1F << CS_ACTUAL_SHIFT;
    /// Open load on phase B.
    pub const OLB: u32 = 1 << 7;
    /// Open load on phase A.
    pub const OLA: u32 = 1 << 6;
    /// Short on low-side MOSFET, phase B.
    pub const S2VSB: u32 = 1 << 5;
    /// Short on low-side MOSFET, phase A.
    pub const S2VSA: u32 = 1 << 4;
    /// Short to ground, phase B.
    pub const S2GB: u32 = 1 << 3;
    /// Short to ground, phase A.
    pub const S2GA: u32 = 1 << 2;
    /// Overtemperature shutdown.
    pub const OT: u32 = 1 << 1;
    /// Overtemperature prewarning.
    pub const OTPW: u32 = 1 << 0;
}
