use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;

// Actuator Types
/// Position of the two-speed gearbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gear {
    /// Relay released, high-speed ratio.
    Off,
    /// Relay engaged, low-speed/high-torque ratio.
    #[default]
    Low,
}

impl Gear {
    pub fn toggled(self) -> Gear {
        match self {
            Gear::Off => Gear::Low,
            Gear::Low => Gear::Off,
        }
    }
}

// Sensor Traits
/// Gyro-style heading in degrees, wrapping within [0, 360).
pub trait HeadingSource {
    fn heading(&self) -> Result<f64, SensorError>;
}

/// Accelerometer with an integrated longitudinal speed estimate.
pub trait MotionSource {
    fn speed(&self) -> Result<f64, SensorError>;
    /// Acceleration along the x, y and z axes.
    fn acceleration(&self) -> Result<[f64; 3], SensorError>;
}

pub trait RangeSource {
    fn distance(&self) -> Result<f64, SensorError>;
}

// Actuator Traits
/// Left/right drive outputs, each in [-1, 1].
///
/// Sign convention: a positive differential (`right - left`) increases the
/// reported heading.
pub trait MotorOutput {
    fn set_left_right(&mut self, left: f64, right: f64);
}

pub trait GearRelay {
    fn set(&mut self, gear: Gear);
}

// General Traits
/// Monotonic reset-and-read timer.
pub trait Clock {
    fn elapsed(&self) -> Duration;
    fn reset(&mut self);
}

/// Dashboard-style key/value publisher. Publishing is best-effort.
pub trait TelemetrySink {
    fn put_number(&mut self, key: &str, value: f64);
    fn put_bool(&mut self, key: &str, value: bool);
}

#[derive(Debug, Clone, Copy)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

pub trait Model {
    fn reset(&mut self);
}
