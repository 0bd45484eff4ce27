//! Simulated sensors and actuators backed by a shared [`TankDrivetrain`].

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use robotcore::{
    AnalogSonar, Gear, GearRelay, HeadingSource, MotionSource, MotorOutput, SensorError,
    normalize_degrees,
};

use crate::tank::TankDrivetrain;

pub type SharedDrivetrain = Rc<RefCell<TankDrivetrain>>;

const GRAVITY: f64 = 9.81;

/// Gaussian noise source with its own seeded generator.
struct Noise {
    distribution: Normal<f64>,
    rng: RefCell<StdRng>,
}

impl Noise {
    fn new(std_dev: f64, seed: u64) -> Option<Self> {
        let distribution = Normal::new(0.0, std_dev).ok()?;
        Some(Noise {
            distribution,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        })
    }

    fn sample(&self) -> f64 {
        self.distribution.sample(&mut *self.rng.borrow_mut())
    }
}

fn jitter(noise: &Option<Noise>) -> f64 {
    noise.as_ref().map_or(0.0, Noise::sample)
}

pub struct SimGyro {
    plant: SharedDrivetrain,
    noise: Option<Noise>,
}

impl SimGyro {
    pub fn new(plant: SharedDrivetrain) -> Self {
        SimGyro { plant, noise: None }
    }

    /// Add zero-mean Gaussian noise in degrees. Invalid deviations are ignored.
    pub fn with_noise(mut self, std_dev: f64, seed: u64) -> Self {
        self.noise = Noise::new(std_dev, seed);
        self
    }
}

impl HeadingSource for SimGyro {
    fn heading(&self) -> Result<f64, SensorError> {
        let plant = self.plant.borrow();
        if !plant.links.gyro {
            return Err(SensorError::Unavailable("gyro"));
        }
        Ok(normalize_degrees(plant.pose().heading + jitter(&self.noise)))
    }
}

pub struct SimAccelerometer {
    plant: SharedDrivetrain,
    noise: Option<Noise>,
}

impl SimAccelerometer {
    pub fn new(plant: SharedDrivetrain) -> Self {
        SimAccelerometer { plant, noise: None }
    }

    /// Add zero-mean Gaussian noise in m/s^2 to acceleration readings.
    pub fn with_noise(mut self, std_dev: f64, seed: u64) -> Self {
        self.noise = Noise::new(std_dev, seed);
        self
    }
}

impl MotionSource for SimAccelerometer {
    fn speed(&self) -> Result<f64, SensorError> {
        let plant = self.plant.borrow();
        if !plant.links.accelerometer {
            return Err(SensorError::Unavailable("accelerometer"));
        }
        Ok(plant.speed())
    }

    fn acceleration(&self) -> Result<[f64; 3], SensorError> {
        let plant = self.plant.borrow();
        if !plant.links.accelerometer {
            return Err(SensorError::Unavailable("accelerometer"));
        }
        // Lateral acceleration is the centripetal term v * omega
        Ok([
            plant.acceleration() + jitter(&self.noise),
            plant.speed() * plant.yaw_rate() + jitter(&self.noise),
            GRAVITY + jitter(&self.noise),
        ])
    }
}

/// Ultrasonic range finder looking along the heading at a wall across the field.
pub struct SimSonar {
    plant: SharedDrivetrain,
    /// Wall position along +y, in meters
    wall_y: f64,
}

impl SimSonar {
    const MAX_VOLTAGE: f64 = 5.0;
    const INCHES_PER_METER: f64 = 39.37;

    pub fn new(plant: SharedDrivetrain, wall_y: f64) -> Self {
        SimSonar { plant, wall_y }
    }

    /// Analog output voltage for the current pose; saturates when no echo returns.
    pub fn voltage(&self) -> Result<f64, SensorError> {
        let plant = self.plant.borrow();
        if !plant.links.sonar {
            return Err(SensorError::Unavailable("sonar"));
        }
        let pose = plant.pose();
        let facing = pose.heading.to_radians().cos();
        let gap = self.wall_y - pose.position.y;
        if facing <= 0.0 || gap <= 0.0 {
            return Ok(Self::MAX_VOLTAGE);
        }
        let inches = gap / facing * Self::INCHES_PER_METER;
        Ok((inches / robotcore::range::SONAR_INCHES_PER_VOLT).min(Self::MAX_VOLTAGE))
    }

    /// Wrap as a [`robotcore::RangeSource`] reporting inches.
    pub fn into_range(self) -> AnalogSonar<impl Fn() -> Result<f64, SensorError>> {
        AnalogSonar::new(move || self.voltage())
    }
}

pub struct SimMotors {
    plant: SharedDrivetrain,
}

impl SimMotors {
    pub fn new(plant: SharedDrivetrain) -> Self {
        SimMotors { plant }
    }
}

impl MotorOutput for SimMotors {
    fn set_left_right(&mut self, left: f64, right: f64) {
        self.plant.borrow_mut().set_command(left, right);
    }
}

pub struct SimGearbox {
    plant: SharedDrivetrain,
}

impl SimGearbox {
    pub fn new(plant: SharedDrivetrain) -> Self {
        SimGearbox { plant }
    }
}

impl GearRelay for SimGearbox {
    fn set(&mut self, gear: Gear) {
        self.plant.borrow_mut().set_gear(gear);
    }
}
