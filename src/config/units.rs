//! Unit types for physical quantities.
//!
//! Type-safe representations of the microstep divisor and motor current to
//! prevent unit confusion at compile time.

use serde::Deserialize;

use crate::error::ConfigError;

/// Microstep divisor (1, 2, 4, 8, 16, 32, 64, 128, 256).
///
/// Validated at construction to be a power of 2 within the valid range.
/// The driver chip stores this value as `8 - log2(divisor)` in a 4-bit
/// register field; [`Microsteps::encoded`] and [`Microsteps::from_encoded`]
/// perform that conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Microsteps(u16);

impl Microsteps {
    /// Full step (no microstepping).
    pub const FULL: Self = Self(1);
    /// Half step.
    pub const HALF: Self = Self(2);
    /// Quarter step.
    pub const QUARTER: Self = Self(4);
    /// Eighth step.
    pub const EIGHTH: Self = Self(8);
    /// Sixteenth step.
    pub const SIXTEENTH: Self = Self(16);
    /// Thirty-second step.
    pub const THIRTY_SECOND: Self = Self(32);
    /// Sixty-fourth step.
    pub const SIXTY_FOURTH: Self = Self(64);
    /// 128th step.
    pub const ONE_TWENTY_EIGHTH: Self = Self(128);
    /// 256th step (maximum resolution).
    pub const TWO_FIFTY_SIXTH: Self = Self(256);

    /// Valid microstep values.
    const VALID_VALUES: [u16; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

    /// Create a new Microsteps value with validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrosteps` if the value is not a valid power of 2.
    pub fn new(value: u16) -> Result<Self, ConfigError> {
        if Self::VALID_VALUES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMicrosteps(value))
        }
    }

    /// Get the raw divisor value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Check if a value is valid.
    #[inline]
    pub fn is_valid(value: u16) -> bool {
        Self::VALID_VALUES.contains(&value)
    }

    /// Register encoding of this divisor: `8 - log2(divisor)`, so 256 -> 0
    /// and 1 -> 8.
    #[inline]
    pub const fn encoded(self) -> u8 {
        8 - self.0.trailing_zeros() as u8
    }

    /// Decode a 4-bit register field back into a divisor.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrostepCode` for codes above 8.
    pub fn from_encoded(code: u8) -> Result<Self, ConfigError> {
        if code > 8 {
            return Err(ConfigError::InvalidMicrostepCode(code));
        }
        Ok(Self(1 << (8 - code)))
    }
}

impl Default for Microsteps {
    fn default() -> Self {
        Self::SIXTEENTH
    }
}

impl TryFrom<u16> for Microsteps {
    type Error = ConfigError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Microsteps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use core::fmt::Write;
        let value = u16::deserialize(deserializer)?;
        Microsteps::new(value).map_err(|e| {
            let mut buf = heapless::String::<128>::new();
            let _ = write!(buf, "{}", e);
            serde::de::Error::custom(buf.as_str())
        })
    }
}

/// Motor coil current in milliamperes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct Milliamps(pub u16);

impl Milliamps {
    /// Create a new Milliamps value.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microsteps_valid_values() {
        for &v in &Microsteps::VALID_VALUES {
            assert!(Microsteps::new(v).is_ok());
        }
    }

    #[test]
    fn test_microsteps_invalid_values() {
        assert!(Microsteps::new(0).is_err());
        assert!(Microsteps::new(3).is_err());
        assert!(Microsteps::new(17).is_err());
        assert!(Microsteps::new(512).is_err());
    }

    #[test]
    fn test_register_encoding() {
        assert_eq!(Microsteps::TWO_FIFTY_SIXTH.encoded(), 0);
        assert_eq!(Microsteps::SIXTEENTH.encoded(), 4);
        assert_eq!(Microsteps::FULL.encoded(), 8);
    }

    #[test]
    fn test_encoding_round_trip() {
        for &v in &Microsteps::VALID_VALUES {
            let ms = Microsteps::new(v).unwrap();
            assert_eq!(Microsteps::from_encoded(ms.encoded()).unwrap(), ms);
        }
        assert!(Microsteps::from_encoded(9).is_err());
    }
}
