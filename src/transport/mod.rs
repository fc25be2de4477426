//! Byte-level transport to the motor-driver chip.
//!
//! The driver chip is configured over a half-duplex single-wire UART using
//! fixed-format, CRC-protected request/reply frames. [`UartTransport`] owns
//! the serial peripheral and implements the frame protocol; [`RegisterBus`]
//! is the capability the register facade consumes, so higher layers never
//! depend on a concrete peripheral type.

mod crc;
mod uart;

pub use crc::crc8;
pub use uart::UartTransport;

use crate::error::Result;

/// Register-level access to the motor-driver chip.
pub trait RegisterBus {
    /// Read a register as an unsigned 32-bit value.
    fn read_u32(&mut self, reg: u8) -> Result<u32>;

    /// Read a register as a signed 32-bit value.
    fn read_i32(&mut self, reg: u8) -> Result<i32> {
        Ok(self.read_u32(reg)? as i32)
    }

    /// Write a 32-bit value to a register without confirmation.
    fn write(&mut self, reg: u8, value: u32) -> Result<()>;

    /// Write a register and verify the chip accepted it.
    ///
    /// Returns `true` only when the write demonstrably took effect. Any
    /// transport fault during the verification is reported as `false`, not
    /// as an error; callers gate on the boolean.
    fn write_checked(&mut self, reg: u8, value: u32) -> bool;

    /// Update only the bits selected by `mask` to match `value`.
    fn update_bits(&mut self, reg: u8, mask: u32, value: u32) -> Result<bool> {
        let current = self.read_u32(reg)?;
        Ok(self.write_checked(reg, (current & !mask) | (value & mask)))
    }

    /// Drain any stale bytes from the receive side. Default is a no-op for
    /// buses without a receive buffer.
    fn flush_rx(&mut self) {}
}
