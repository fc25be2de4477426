//! # scanhead-control
//!
//! Control core for a laser-scanning direct-imaging head: a stepper-motor
//! subsystem configured over a CRC-protected UART register protocol, and a
//! scan-job executor that streams compressed, line-oriented job files to an
//! FPGA scan engine in real time.
//!
//! ## Features
//!
//! - **Tolerant UART transport**: frame resynchronization, bounded retries
//!   and counter-verified writes toward the motor-driver chip
//! - **Register facade**: named accessors for microstepping, coil current,
//!   chopper and direction configuration
//! - **Print loop**: tick-based cooperative state machine with pause/stop
//!   checkpoints, multi-lane geometry and bounded error recovery
//! - **Capability seams**: `embedded-hal` 1.0 traits for hardware, plus
//!   host/clock/job-source traits so everything runs against mocks
//! - **no_std compatible**: the executor needs `alloc`; file loading and
//!   TOML configuration need `std`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanhead_control::{JobExecutor, StdClock, SystemConfig, ZlibJobFile};
//!
//! let config = scanhead_control::load_config("scanhead.toml")?;
//! let mut executor = JobExecutor::new(host, StdClock::new(), delay, config);
//!
//! let job = ZlibJobFile::open("sd/jobs/panel.job")?;
//! executor.start("panel.job", job)?;
//! executor.run_to_completion()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): file I/O, TOML parsing and zlib job files
//! - `alloc`: enables the job executor without `std`
//! - `defmt`: defmt logging support for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod config;
pub mod error;
pub mod fpga;
#[cfg(feature = "alloc")]
pub mod job;
pub mod motor;
pub mod notify;
pub mod transport;

// Re-exports for ergonomic API
pub use config::{
    validate_config, DriverConfig, Microsteps, Milliamps, PrintDefaults, ScannerConfig,
    SystemConfig, UartConfig,
};
pub use error::{Error, Result};
pub use fpga::{Components, FpgaFlags, FpgaHost, SimulatedHost};
pub use motor::{DriverProbe, DriverStatus, StepperDriver};
pub use notify::{Listener, StateSignal};
pub use transport::{crc8, RegisterBus, UartTransport};

#[cfg(feature = "alloc")]
pub use job::{Clock, ComponentState, ExecState, JobExecutor, JobHeader, JobSource, MachineState, PrintJob};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
#[cfg(feature = "std")]
pub use job::{StdClock, ZlibJobFile};
