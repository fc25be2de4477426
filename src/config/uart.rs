//! Motor-driver UART link configuration.

use serde::Deserialize;

/// UART link parameters for the motor-driver chip.
#[derive(Debug, Clone, Deserialize)]
pub struct UartConfig {
    /// Line speed in baud.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Driver node address on the shared bus (0-3).
    #[serde(default)]
    pub node_address: u8,

    /// Per-byte receive timeout in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u32,

    /// Read attempts before a register read gives up.
    #[serde(default = "default_retries")]
    pub retries: u8,
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u32 {
    20
}

fn default_retries() -> u8 {
    10
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            node_address: 0,
            read_timeout_ms: default_read_timeout_ms(),
            retries: default_retries(),
        }
    }
}

impl UartConfig {
    /// Inter-frame pause: 500 bit times, floored at 0.5 ms.
    ///
    /// The driver chip needs idle time between frames on the half-duplex
    /// single-wire bus before it will answer.
    pub fn pause_us(&self) -> u32 {
        (500_000_000 / self.baud_rate.max(1)).max(500)
    }

    /// Wire time of one 10-bit UART symbol in microseconds.
    pub fn byte_us(&self) -> u32 {
        (10_000_000 / self.baud_rate.max(1)).max(1)
    }

    /// Total budget for one reply capture: 3x the per-byte read timeout.
    pub fn reply_timeout_us(&self) -> u32 {
        self.read_timeout_ms.saturating_mul(3_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_derivation() {
        let cfg = UartConfig::default();
        // 500 bit times at 115200 baud is ~4.3 ms
        assert_eq!(cfg.pause_us(), 4340);

        let fast = UartConfig {
            baud_rate: 4_000_000,
            ..UartConfig::default()
        };
        // floored at 0.5 ms
        assert_eq!(fast.pause_us(), 500);
    }

    #[test]
    fn test_reply_timeout() {
        let cfg = UartConfig::default();
        assert_eq!(cfg.reply_timeout_us(), 60_000);
    }
}
