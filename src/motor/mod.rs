//! Motor-driver chip support: register map and named-field facade.

mod driver;
pub mod registers;

pub use driver::{DriverProbe, DriverStatus, StepperDriver};
