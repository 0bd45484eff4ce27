//! Closed-loop drivetrain control
//!
//! This crate provides:
//! - A PID controller on a wrapping heading input
//! - The two-speed gearbox state machine
//! - Arcade drive mixing and button edge detection
//! - The per-cycle drive mode arbiter tying them together

pub mod arbiter;
pub mod arcade;
pub mod config;
pub mod edge;
pub mod gearbox;
pub mod pid;
pub mod telemetry;

pub use arbiter::*;
pub use arcade::arcade;
pub use config::{ConfigError, DriveConfig};
pub use edge::RisingEdge;
pub use gearbox::{GearConfig, GearState, Gearbox};
pub use pid::{PidConfig, PidController};
pub use telemetry::{LogTelemetry, MemoryTelemetry, TelemetryValue};
