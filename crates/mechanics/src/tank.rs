use log::debug;
use nalgebra::Vector2;
use robotcore::{Gear, Model, SimContext, normalize_degrees};
use serde::{Deserialize, Serialize};

/// Physical configuration of a two-sided (tank) drivetrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankDrivetrainConfig {
    /// Distance between left and right wheel contact patches in meters.
    pub track_width: f64,
    /// Free speed at full command with the shifter relay engaged, in m/s.
    pub low_gear_top_speed: f64,
    /// Free speed at full command with the shifter relay released, in m/s.
    pub high_gear_top_speed: f64,
    /// First-order response time of each side to a command change, in seconds.
    pub time_constant: f64,
    /// Fraction of commanded speed the right side actually delivers.
    /// Values below 1.0 model a weak or dragging side that pulls the robot off line.
    pub right_side_efficiency: f64,
}

impl Default for TankDrivetrainConfig {
    fn default() -> Self {
        TankDrivetrainConfig {
            track_width: 0.6,
            low_gear_top_speed: 2.5,
            high_gear_top_speed: 4.0,
            time_constant: 0.15,
            right_side_efficiency: 1.0,
        }
    }
}

/// Body state reported by the plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Field position in meters; +y is heading 0.
    pub position: Vector2<f64>,
    /// Compass heading in degrees, [0, 360), increasing clockwise.
    pub heading: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Pose {
            position: Vector2::zeros(),
            heading: 0.0,
        }
    }
}

/// Which simulated sensors currently answer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorLinks {
    pub gyro: bool,
    pub accelerometer: bool,
    pub sonar: bool,
}

impl Default for SensorLinks {
    fn default() -> Self {
        SensorLinks {
            gyro: true,
            accelerometer: true,
            sonar: true,
        }
    }
}

/// Kinematic tank drivetrain with per-side speed lag and a two-speed gearbox.
#[derive(Debug, Clone)]
pub struct TankDrivetrain {
    pub config: TankDrivetrainConfig,
    pub links: SensorLinks,
    command: [f64; 2],
    gear: Gear,
    shifts: usize,
    side_speeds: [f64; 2],
    speed: f64,
    acceleration: f64,
    yaw_rate: f64,
    pose: Pose,
}

impl TankDrivetrain {
    pub fn new(config: TankDrivetrainConfig) -> Self {
        TankDrivetrain {
            config,
            links: SensorLinks::default(),
            command: [0.0; 2],
            gear: Gear::Low,
            shifts: 0,
            side_speeds: [0.0; 2],
            speed: 0.0,
            acceleration: 0.0,
            yaw_rate: 0.0,
            pose: Pose::default(),
        }
    }

    pub fn set_command(&mut self, left: f64, right: f64) {
        self.command = [left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0)];
    }

    pub fn command(&self) -> [f64; 2] {
        self.command
    }

    pub fn set_gear(&mut self, gear: Gear) {
        if gear != self.gear {
            debug!("Plant gearbox {:?} -> {:?}", self.gear, gear);
            self.shifts += 1;
        }
        self.gear = gear;
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    /// Number of actual gear changes seen by the plant.
    pub fn shifts(&self) -> usize {
        self.shifts
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.pose.heading = normalize_degrees(heading);
    }

    /// Longitudinal speed in m/s, positive toward the heading.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Longitudinal acceleration in m/s^2 over the last step.
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Yaw rate in rad/s, positive clockwise.
    pub fn yaw_rate(&self) -> f64 {
        self.yaw_rate
    }

    fn top_speed(&self) -> f64 {
        match self.gear {
            Gear::Low => self.config.low_gear_top_speed,
            Gear::Off => self.config.high_gear_top_speed,
        }
    }

    /// Advance the plant by `ctx.dt`.
    pub fn step_physics(&mut self, ctx: SimContext) {
        let dt = ctx.dt;
        if dt <= 0.0 {
            return;
        }
        let top = self.top_speed();
        let targets = [
            self.command[0] * top,
            self.command[1] * top * self.config.right_side_efficiency,
        ];

        // Discrete first-order lag toward the commanded side speed
        let alpha = dt / (self.config.time_constant + dt);
        for (speed, target) in self.side_speeds.iter_mut().zip(targets) {
            *speed += (target - *speed) * alpha;
        }

        let [left, right] = self.side_speeds;
        let speed = 0.5 * (left + right);
        self.acceleration = (speed - self.speed) / dt;
        self.speed = speed;
        self.yaw_rate = (right - left) / self.config.track_width;

        // Semi-implicit: integrate position with the NEW velocities
        let heading = self.pose.heading + self.yaw_rate.to_degrees() * dt;
        self.pose.heading = normalize_degrees(heading);
        let rad = self.pose.heading.to_radians();
        let direction = Vector2::new(rad.sin(), rad.cos());
        self.pose.position += direction * speed * dt;
    }
}

impl Model for TankDrivetrain {
    fn reset(&mut self) {
        self.command = [0.0; 2];
        self.side_speeds = [0.0; 2];
        self.speed = 0.0;
        self.acceleration = 0.0;
        self.yaw_rate = 0.0;
        self.pose = Pose::default();
    }
}
