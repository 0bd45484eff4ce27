//! Simulated drivetrain plant and the devices that expose it to the controller.

pub mod devices;
pub mod tank;

pub use devices::{SharedDrivetrain, SimAccelerometer, SimGearbox, SimGyro, SimMotors, SimSonar};
pub use tank::{Pose, SensorLinks, TankDrivetrain, TankDrivetrainConfig};
