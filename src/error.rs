//! Error types for scanhead-control.
//!
//! Provides unified error handling across configuration, the motor-driver
//! UART transport, and scan-job execution.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all scanhead-control operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor-driver UART transport error
    Transport(TransportError),
    /// Scan-job execution error
    Job(JobError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Invalid microstep register code (must be 0-8)
    InvalidMicrostepCode(u8),
    /// Laser power outside the supported range (50-150)
    InvalidLaserPower(u8),
    /// Exposures per line must be at least 1
    InvalidExposures(u16),
    /// Polygon speed must be > 0 rpm
    InvalidRpm(u32),
    /// Scanline must contain at least one command word
    InvalidWordsPerLine(u32),
    /// Driver node address must be 0-3
    InvalidNodeAddress(u8),
    /// UART baud rate must be > 0
    InvalidBaudRate(u32),
    /// Hold-current multiplier must be in (0, 1]
    InvalidHoldMultiplier(f32),
    /// Hold-current delay field is 4 bits (0-15)
    InvalidHoldDelay(u8),
    /// Sense resistor value must be > 0 ohms
    InvalidSenseResistor(f32),
    /// Current reference voltage must be > 0 V
    InvalidVref(f32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motor-driver UART transport errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// No plausible reply frame arrived within the timeout/retry budget
    Timeout,
    /// The request frame could not be written out completely
    WriteFailed,
}

/// Scan-job execution errors.
#[derive(Debug, Clone, PartialEq)]
pub enum JobError {
    /// Operation requires the executor to be idle
    Busy,
    /// Job header lane width is not a positive finite number
    InvalidLaneWidth(f32),
    /// Job header declares no facets or no lanes
    EmptyGeometry {
        /// Facets per lane from the header
        facets_per_lane: u32,
        /// Lane count from the header
        lane_count: u32,
    },
    /// The compressed body ended before all scanlines were read
    TruncatedStream,
    /// Scan-engine link failure that survived the retry budget
    Communication,
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Job(e) => write!(f, "Job error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidMicrostepCode(v) => {
                write!(f, "Invalid microstep register code: {}. Must be 0-8", v)
            }
            ConfigError::InvalidLaserPower(v) => {
                write!(f, "Invalid laser power: {}. Must be 50-150", v)
            }
            ConfigError::InvalidExposures(v) => {
                write!(f, "Invalid exposures per line: {}. Must be >= 1", v)
            }
            ConfigError::InvalidRpm(v) => write!(f, "Invalid polygon speed: {} rpm. Must be > 0", v),
            ConfigError::InvalidWordsPerLine(v) => {
                write!(f, "Invalid words per scanline: {}. Must be > 0", v)
            }
            ConfigError::InvalidNodeAddress(v) => {
                write!(f, "Invalid driver node address: {}. Must be 0-3", v)
            }
            ConfigError::InvalidBaudRate(v) => write!(f, "Invalid baud rate: {}. Must be > 0", v),
            ConfigError::InvalidHoldMultiplier(v) => {
                write!(f, "Invalid hold multiplier: {}. Must be in (0, 1]", v)
            }
            ConfigError::InvalidHoldDelay(v) => {
                write!(f, "Invalid hold delay: {}. Must be 0-15", v)
            }
            ConfigError::InvalidSenseResistor(v) => {
                write!(f, "Invalid sense resistor: {} ohm. Must be > 0", v)
            }
            ConfigError::InvalidVref(v) => write!(f, "Invalid vref: {} V. Must be > 0", v),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "No valid reply frame before timeout"),
            TransportError::WriteFailed => write!(f, "Request frame write incomplete"),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Busy => write!(f, "A print job is already active"),
            JobError::InvalidLaneWidth(v) => {
                write!(f, "Invalid lane width {} mm. Must be positive and finite", v)
            }
            JobError::EmptyGeometry {
                facets_per_lane,
                lane_count,
            } => write!(
                f,
                "Empty job geometry: {} facets per lane, {} lanes",
                facets_per_lane, lane_count
            ),
            JobError::TruncatedStream => write!(f, "Job stream ended before the last scanline"),
            JobError::Communication => write!(f, "Scan-engine communication failed"),
            #[cfg(feature = "std")]
            JobError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<JobError> for Error {
    fn from(e: JobError) -> Self {
        Error::Job(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for JobError {}
