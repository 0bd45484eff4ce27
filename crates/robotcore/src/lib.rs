//! Shared types and collaborator interfaces for the drivetrain controller.
//!
//! This crate provides:
//! - Sensor and actuator traits the controller reads from and writes to
//! - Operator input snapshots
//! - Wrap-aware heading arithmetic
//! - Reset-and-read clocks for real hardware and simulation

pub mod angle;
pub mod clock;
pub mod error;
pub mod input;
pub mod range;
pub mod traits;

pub use angle::{heading_error, normalize_degrees};
pub use clock::{ManualClock, MonotonicClock, SimTime};
pub use error::SensorError;
pub use input::ControlInput;
pub use range::{AnalogSonar, sonar_distance};
pub use traits::*;
