//! Scripted teleop session against the simulated drivetrain.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use control::{
    ConfigError, DriveConfig, DriveController, DriveHardware, LogTelemetry, MemoryTelemetry,
    TelemetryValue,
};
use log::{debug, info};
use mechanics::{
    SimAccelerometer, SimGearbox, SimGyro, SimMotors, SimSonar, TankDrivetrain,
    TankDrivetrainConfig,
};
use robotcore::{
    ControlInput, Gear, ManualClock, RangeSource, SimContext, SimTime, TelemetrySink,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Drive config: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown log level {0:?}")]
    LogLevel(String),

    #[error("Logger already initialized: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("Invalid session: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned() }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter, SessionError> {
        self.level
            .parse()
            .map_err(|_| SessionError::LogLevel(self.level.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Control period in seconds
    pub dt: f64,
    /// Gyro noise standard deviation in degrees
    pub gyro_noise: Option<f64>,
    /// Accelerometer noise standard deviation in m/s^2
    pub accel_noise: Option<f64>,
    pub seed: u64,
    /// Distance from the start position to the wall the sonar faces, in meters
    pub wall_distance: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,
            gyro_noise: None,
            accel_noise: None,
            seed: 0,
            wall_distance: 8.0,
        }
    }
}

/// What the robot does for the length of a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Operator input held for every cycle of the phase
    Teleop(ControlInput),
    /// Autonomous turn to a heading in degrees; stops once on target
    TurnTo(f64),
    Tank { left: f64, right: f64 },
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub seconds: f64,
    pub action: Action,
    /// Connect or disconnect the gyro at the start of the phase
    #[serde(default)]
    pub gyro: Option<bool>,
}

impl Phase {
    fn teleop(seconds: f64, input: ControlInput) -> Self {
        Phase {
            seconds,
            action: Action::Teleop(input),
            gyro: None,
        }
    }
}

fn demo_script() -> Vec<Phase> {
    let idle = ControlInput::idle();
    vec![
        Phase::teleop(3.0, ControlInput::with_sticks(1.0, 0.0)),
        Phase::teleop(0.02, ControlInput { right_turn: true, ..idle }),
        Phase::teleop(2.0, idle),
        Phase::teleop(0.2, ControlInput::with_sticks(0.0, 0.3)),
        Phase::teleop(1.0, idle),
        Phase::teleop(0.02, ControlInput { switch_front: true, ..idle }),
        Phase::teleop(2.0, ControlInput::with_sticks(0.5, 0.0)),
        Phase {
            seconds: 1.0,
            action: Action::Teleop(ControlInput::with_sticks(0.5, 0.0)),
            gyro: Some(false),
        },
        Phase {
            seconds: 2.0,
            action: Action::TurnTo(0.0),
            gyro: Some(true),
        },
        Phase {
            seconds: 0.5,
            action: Action::Stop,
            gyro: None,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub drive: DriveConfig,
    pub plant: TankDrivetrainConfig,
    pub logging: LoggingConfig,
    pub sim: SimConfig,
    pub script: Vec<Phase>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drive: DriveConfig::default(),
            plant: TankDrivetrainConfig::default(),
            logging: LoggingConfig::default(),
            sim: SimConfig::default(),
            script: demo_script(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let contents = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.drive.validate()?;
        self.logging.level_filter()?;
        if !(self.sim.dt.is_finite() && self.sim.dt > 0.0) {
            return Err(SessionError::Invalid(format!("dt {} must be positive", self.sim.dt)));
        }
        if !(self.plant.track_width > 0.0 && self.plant.time_constant >= 0.0) {
            return Err(SessionError::Invalid(
                "plant needs a positive track width and non-negative time constant".to_owned(),
            ));
        }
        for (index, phase) in self.script.iter().enumerate() {
            if !(phase.seconds.is_finite() && phase.seconds > 0.0) {
                return Err(SessionError::Invalid(format!(
                    "phase {index} lasts {} s",
                    phase.seconds
                )));
            }
        }
        Ok(())
    }
}

/// Forwards dashboard values to the log and keeps the latest of each.
struct Dashboard {
    memory: MemoryTelemetry,
    log: LogTelemetry,
}

impl TelemetrySink for Dashboard {
    fn put_number(&mut self, key: &str, value: f64) {
        self.log.put_number(key, value);
        self.memory.put_number(key, value);
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.log.put_bool(key, value);
        self.memory.put_bool(key, value);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub cycles: usize,
    pub seconds: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub mode: String,
    pub gear: Gear,
    pub automatic_shifting: bool,
    pub shifts: usize,
    pub top_speed: f64,
    pub sonar_inches: Option<f64>,
    pub dashboard: BTreeMap<String, TelemetryValue>,
}

/// Run every phase of the script and report where the robot ended up.
pub fn run_session(config: &SessionConfig) -> Result<Summary, SessionError> {
    config.validate()?;

    let plant = Rc::new(RefCell::new(TankDrivetrain::new(config.plant.clone())));
    let time = SimTime::new();
    let memory = MemoryTelemetry::new();

    let mut gyro = SimGyro::new(plant.clone());
    if let Some(std_dev) = config.sim.gyro_noise {
        gyro = gyro.with_noise(std_dev, config.sim.seed);
    }
    let mut accelerometer = SimAccelerometer::new(plant.clone());
    if let Some(std_dev) = config.sim.accel_noise {
        accelerometer = accelerometer.with_noise(std_dev, config.sim.seed.wrapping_add(1));
    }
    let sonar = SimSonar::new(plant.clone(), config.sim.wall_distance).into_range();

    let hardware = DriveHardware {
        heading: Box::new(gyro),
        motion: Box::new(accelerometer),
        motors: Box::new(SimMotors::new(plant.clone())),
        relay: Box::new(SimGearbox::new(plant.clone())),
        clock: Box::new(ManualClock::new(time.clone())),
        telemetry: Some(Box::new(Dashboard {
            memory: memory.clone(),
            log: LogTelemetry,
        })),
    };
    let mut controller = DriveController::new(config.drive.clone(), hardware)?;

    let dt = config.sim.dt;
    let mut cycles = 0;
    let mut top_speed: f64 = 0.0;
    for (index, phase) in config.script.iter().enumerate() {
        if let Some(online) = phase.gyro {
            plant.borrow_mut().links.gyro = online;
        }
        let phase_cycles = (phase.seconds / dt).round().max(1.0) as usize;
        debug!("Phase {index}: {:?} for {phase_cycles} cycles", phase.action);

        let mut turn_done = false;
        for _ in 0..phase_cycles {
            match &phase.action {
                Action::Teleop(input) => controller.step(input),
                Action::TurnTo(angle) if !turn_done => {
                    if !controller.turn_to(*angle) {
                        info!("Reached {angle:.1} deg");
                        turn_done = true;
                    }
                }
                Action::TurnTo(_) | Action::Stop => controller.stop(),
                Action::Tank { left, right } => controller.drive_tank(*left, *right),
            }

            let t = time.now().as_secs_f64();
            plant.borrow_mut().step_physics(SimContext { dt, t });
            time.advance_secs(dt);
            top_speed = top_speed.max(plant.borrow().speed().abs());
            cycles += 1;
        }
    }

    let plant = plant.borrow();
    let pose = plant.pose();
    let gear = controller.gear_state();
    Ok(Summary {
        cycles,
        seconds: time.now().as_secs_f64(),
        x: pose.position.x,
        y: pose.position.y,
        heading: pose.heading,
        mode: format!("{:?}", controller.mode()),
        gear: gear.gear,
        automatic_shifting: gear.automatic,
        shifts: plant.shifts(),
        top_speed,
        sonar_inches: sonar.distance().ok(),
        dashboard: memory.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_session_runs() {
        let config = SessionConfig::default();
        let expected: usize = config
            .script
            .iter()
            .map(|phase| (phase.seconds / config.sim.dt).round() as usize)
            .sum();
        let summary = run_session(&config).unwrap();
        assert_eq!(summary.cycles, expected);
        assert!(summary.shifts >= 1);
        assert!(summary.top_speed > 2.0);
        assert_eq!(summary.mode, "ManualArcade");
        assert!(summary.dashboard.contains_key("Speed"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "logging": { "level": "warn" },
            "script": [
                { "seconds": 1.0, "action": { "teleop": { "left_y": 0.5 } } },
                { "seconds": 0.5, "action": { "tank": { "left": 0.2, "right": 0.2 } } },
                { "seconds": 0.1, "action": "stop" }
            ]
        }"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.sim.dt, 0.02);
        assert_eq!(config.drive, DriveConfig::default());
        assert_eq!(config.script.len(), 3);

        let summary = run_session(&config).unwrap();
        assert_eq!(summary.cycles, 80);
        assert!(summary.y > 0.5);
        assert_eq!(summary.sonar_inches.map(|inches| inches < 512.0), Some(true));
    }

    #[test]
    fn test_turn_phase_reaches_heading() {
        let mut config = SessionConfig::default();
        config.drive.heading_pid = control::PidConfig::pid(0.02, 0.0, 0.0);
        config.script = vec![Phase {
            seconds: 2.0,
            action: Action::TurnTo(90.0),
            gyro: None,
        }];
        let summary = run_session(&config).unwrap();
        assert_eq!(summary.mode, "ManualArcade");
        assert!(summary.heading > 80.0);
    }

    #[test]
    fn test_rejects_bad_sessions() {
        let mut config = SessionConfig::default();
        config.sim.dt = 0.0;
        assert!(matches!(config.validate(), Err(SessionError::Invalid(_))));

        let mut config = SessionConfig::default();
        config.logging.level = "loud".to_owned();
        assert!(matches!(config.validate(), Err(SessionError::LogLevel(_))));

        let mut config = SessionConfig::default();
        config.drive.ramp_factor = 2.0;
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }
}
