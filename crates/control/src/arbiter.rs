//! Drive Mode Arbiter
//!
//! Runs once per control period during teleoperated driving. Each call reads
//! the heading and motion sensors, picks exactly one drive mode, steps the
//! PID controller that mode needs (if any), and issues one left/right motor
//! command. Gear shifting and telemetry are evaluated after the motor command.
//!
//! Mode priority, highest first:
//! 1. Driver turn stick cancels a programmed turn
//! 2. Turn-around, then left 90, then right 90 requests start a programmed turn
//! 3. A programmed turn in progress keeps the motors
//! 4. Forward stick alone engages straight drive (heading hold)
//! 5. Otherwise plain arcade drive

use log::{debug, info, warn};
use robotcore::{
    Clock, ControlInput, GearRelay, HeadingSource, Model, MotionSource, MotorOutput, SensorError,
    TelemetrySink, heading_error, normalize_degrees,
};

use crate::arcade::arcade;
use crate::config::{ConfigError, DriveConfig};
use crate::edge::RisingEdge;
use crate::gearbox::{GearState, Gearbox};
use crate::pid::PidController;
use crate::telemetry;

/// Active drive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    #[default]
    ManualArcade,
    StraightDrive,
    Turn90Left,
    Turn90Right,
    Turn180,
    /// Programmatic turn started by [`DriveController::turn_to`]
    TurnToAngle,
}

impl DriveMode {
    pub fn is_turn(self) -> bool {
        matches!(
            self,
            DriveMode::Turn90Left | DriveMode::Turn90Right | DriveMode::Turn180 | DriveMode::TurnToAngle
        )
    }

    /// Target heading for an operator turn started at `heading`, in [0, 360).
    pub fn turn_target(self, heading: f64) -> Option<f64> {
        let offset = match self {
            DriveMode::Turn90Left => -90.0,
            DriveMode::Turn90Right => 90.0,
            DriveMode::Turn180 => 180.0,
            _ => return None,
        };
        Some(normalize_degrees(heading + offset))
    }
}

/// Which end of the robot the forward stick drives toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    Front,
    Back,
}

impl Facing {
    pub fn sign(self) -> f64 {
        match self {
            Facing::Front => 1.0,
            Facing::Back => -1.0,
        }
    }

    pub fn flipped(self) -> Facing {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

/// Per-cycle driving state owned by the arbiter
#[derive(Debug, Clone, Default)]
pub struct DriveState {
    pub mode: DriveMode,
    /// Low-pass filtered forward command, already signed by `facing`
    pub ramped_forward: f64,
    /// Turn value issued on the last cycle (stick, straight-drive correction, or turn PID output)
    pub turn_command: f64,
    pub facing: Facing,
    pub straight_drive_active: bool,
    /// Heading latched on entering straight drive; stale otherwise
    pub locked_heading: f64,
    pub gear_switch: RisingEdge,
    pub direction_switch: RisingEdge,
}

/// Collaborators the controller reads from and writes to
pub struct DriveHardware {
    pub heading: Box<dyn HeadingSource>,
    pub motion: Box<dyn MotionSource>,
    pub motors: Box<dyn MotorOutput>,
    pub relay: Box<dyn GearRelay>,
    pub clock: Box<dyn Clock>,
    pub telemetry: Option<Box<dyn TelemetrySink>>,
}

/// Tracks which sensors have gone missing so loss is logged once, not every cycle
#[derive(Debug, Clone, Copy, Default)]
struct SensorHealth {
    heading_lost: bool,
    speed_lost: bool,
    acceleration_lost: bool,
}

const GYRO: &str = "gyro";
const ACCELEROMETER: &str = "accelerometer";

/// Non-finite samples are reported as invalid so they never reach a PID.
fn finite(sensor: &'static str, reading: Result<f64, SensorError>) -> Result<f64, SensorError> {
    match reading {
        Ok(value) if !value.is_finite() => Err(SensorError::InvalidReading { sensor, value }),
        other => other,
    }
}

fn finite_axes(reading: Result<[f64; 3], SensorError>) -> Result<[f64; 3], SensorError> {
    let axes = reading?;
    match axes.iter().find(|value| !value.is_finite()) {
        Some(&value) => Err(SensorError::InvalidReading { sensor: ACCELEROMETER, value }),
        None => Ok(axes),
    }
}

fn observe<T>(lost: &mut bool, sensor: &str, reading: Result<T, SensorError>) -> Option<T> {
    match reading {
        Ok(value) => {
            if *lost {
                info!("{sensor} reading restored");
                *lost = false;
            }
            Some(value)
        }
        Err(err) => {
            if !*lost {
                if err.is_unavailable() {
                    warn!("{sensor} unavailable; skipping dependent behavior");
                } else {
                    warn!("{sensor}: {err}; skipping dependent behavior");
                }
                *lost = true;
            }
            None
        }
    }
}

pub struct DriveController {
    config: DriveConfig,
    hardware: DriveHardware,
    heading_pid: PidController,
    straight_pid: PidController,
    gearbox: Gearbox,
    state: DriveState,
    health: SensorHealth,
}

impl DriveController {
    /// Validate the config, put the gearbox in low and start the shift timer.
    pub fn new(config: DriveConfig, mut hardware: DriveHardware) -> Result<Self, ConfigError> {
        config.validate()?;
        let gearbox = Gearbox::new(config.gear);
        hardware.relay.set(gearbox.gear());
        hardware.clock.reset();
        info!("Drive controller ready in {:?} gear", gearbox.gear());

        Ok(Self {
            heading_pid: PidController::new(config.heading_pid),
            straight_pid: PidController::new(config.straight_pid),
            gearbox,
            config,
            hardware,
            state: DriveState::default(),
            health: SensorHealth::default(),
        })
    }

    pub fn mode(&self) -> DriveMode {
        self.state.mode
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn gear_state(&self) -> GearState {
        self.gearbox.state()
    }

    pub fn heading_pid(&self) -> &PidController {
        &self.heading_pid
    }

    pub fn straight_pid(&self) -> &PidController {
        &self.straight_pid
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Run one teleop control cycle.
    pub fn step(&mut self, input: &ControlInput) {
        let heading = self.read_heading();
        let speed = observe(
            &mut self.health.speed_lost,
            ACCELEROMETER,
            finite(ACCELEROMETER, self.hardware.motion.speed()),
        );

        let target = input.left_y * self.state.facing.sign();
        self.state.ramped_forward += (target - self.state.ramped_forward) * self.config.ramp_factor;

        let (left, right) = self.arbitrate(input, heading);
        self.hardware.motors.set_left_right(left, right);

        self.update_gear(input, speed);

        // Takes effect from the next cycle's ramp
        if self.state.direction_switch.update(input.switch_front) {
            self.state.facing = self.state.facing.flipped();
            info!("Driving toward {:?}", self.state.facing);
        }

        self.publish(heading, speed);
    }

    /// Turn in place toward `angle`, for autonomous routines.
    ///
    /// Starts a turn when none is running; otherwise continues the running
    /// one and finishes it once on target. Returns true while still turning.
    pub fn turn_to(&mut self, angle: f64) -> bool {
        let Some(heading) = self.read_heading() else {
            self.heading_pid.disable();
            self.set_mode(DriveMode::ManualArcade);
            self.hardware.motors.set_left_right(0.0, 0.0);
            return false;
        };

        if !self.heading_pid.is_enabled() {
            self.exit_straight_drive();
            self.heading_pid.enable_at(angle);
            self.set_mode(DriveMode::TurnToAngle);
            debug!("Turning to {:.1} from {:.1}", self.heading_pid.setpoint(), heading);
        } else if heading_error(heading, self.heading_pid.setpoint()).abs() <= self.config.on_target_tolerance {
            self.heading_pid.disable();
            self.state.turn_command = 0.0;
            self.set_mode(DriveMode::ManualArcade);
            self.hardware.motors.set_left_right(0.0, 0.0);
            return false;
        }

        let correction = self.heading_pid.step(heading);
        self.state.turn_command = correction;
        self.hardware.motors.set_left_right(-correction, correction);
        true
    }

    /// Direct left/right command for autonomous routines. Leaves mode state untouched.
    pub fn drive_tank(&mut self, left: f64, right: f64) {
        self.hardware.motors.set_left_right(left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0));
    }

    /// Cancel every closed loop and stop the motors.
    pub fn stop(&mut self) {
        self.heading_pid.disable();
        self.exit_straight_drive();
        self.state.ramped_forward = 0.0;
        self.state.turn_command = 0.0;
        self.set_mode(DriveMode::ManualArcade);
        self.hardware.motors.set_left_right(0.0, 0.0);
    }

    fn read_heading(&mut self) -> Option<f64> {
        let reading = finite(GYRO, self.hardware.heading.heading());
        observe(&mut self.health.heading_lost, GYRO, reading)
    }

    fn arbitrate(&mut self, input: &ControlInput, heading: Option<f64>) -> (f64, f64) {
        let Some(heading) = heading else {
            // Nothing heading-based can run blind
            self.heading_pid.disable();
            return self.manual_arcade(input);
        };

        let turning = self.heading_pid.is_enabled();
        if turning && input.right_x.abs() > self.config.turn_override_deadband {
            info!("{:?} cancelled by driver", self.state.mode);
            self.heading_pid.disable();
            return self.manual_arcade(input);
        }

        if !turning {
            if let Some(mode) = requested_turn(input) {
                if let Some(target) = mode.turn_target(heading) {
                    self.exit_straight_drive();
                    self.heading_pid.enable_at(target);
                    self.set_mode(mode);
                    debug!("Heading PID enabled: {heading:.1} -> {target:.1}");
                }
            }
        }

        if self.heading_pid.is_enabled() {
            return self.follow_turn(input, heading);
        }

        if input.left_y.abs() > self.config.straight_forward_deadband
            && input.right_x.abs() < self.config.straight_turn_deadband
        {
            return self.straight_drive(heading);
        }

        self.manual_arcade(input)
    }

    fn follow_turn(&mut self, input: &ControlInput, heading: f64) -> (f64, f64) {
        if let Some(tolerance) = self.config.turn_complete_tolerance {
            if heading_error(heading, self.heading_pid.setpoint()).abs() <= tolerance {
                info!("{:?} complete at {heading:.1}", self.state.mode);
                self.heading_pid.disable();
                return self.manual_arcade(input);
            }
        }
        let correction = self.heading_pid.step(heading);
        self.state.turn_command = correction;
        (-correction, correction)
    }

    fn straight_drive(&mut self, heading: f64) -> (f64, f64) {
        if !self.state.straight_drive_active {
            self.state.straight_drive_active = true;
            self.state.locked_heading = heading;
            self.set_mode(DriveMode::StraightDrive);
        }

        let drift = heading_error(heading, self.state.locked_heading).abs();
        let tolerance = self.config.straight_tolerance;
        if drift > tolerance && !self.straight_pid.is_enabled() {
            self.straight_pid.enable_at(self.state.locked_heading);
            debug!("Straight drive correcting {drift:.2} deg of drift");
        } else if drift <= tolerance && self.straight_pid.is_enabled() {
            self.straight_pid.disable();
            self.state.turn_command = 0.0;
        }

        let correction = self.straight_pid.step(heading);
        self.state.turn_command = correction;
        arcade(self.state.ramped_forward, correction, self.config.square_inputs)
    }

    fn manual_arcade(&mut self, input: &ControlInput) -> (f64, f64) {
        self.exit_straight_drive();
        self.set_mode(DriveMode::ManualArcade);
        self.state.turn_command = input.right_x;
        arcade(self.state.ramped_forward, input.right_x, self.config.square_inputs)
    }

    fn exit_straight_drive(&mut self) {
        if self.state.straight_drive_active {
            self.state.straight_drive_active = false;
            self.straight_pid.disable();
            self.state.turn_command = 0.0;
        }
    }

    fn set_mode(&mut self, mode: DriveMode) {
        if self.state.mode != mode {
            info!("Drive mode {:?} -> {:?}", self.state.mode, mode);
            self.state.mode = mode;
        }
    }

    fn update_gear(&mut self, input: &ControlInput, speed: Option<f64>) {
        if self.state.gear_switch.update(input.gear_switch) {
            if let Some(gear) = self.gearbox.toggle_automatic() {
                self.hardware.relay.set(gear);
            }
        }
        if let Some(speed) = speed {
            if let Some(gear) = self.gearbox.update(speed, self.hardware.clock.as_mut()) {
                self.hardware.relay.set(gear);
            }
        }
    }

    fn publish(&mut self, heading: Option<f64>, speed: Option<f64>) {
        let Some(sink) = self.hardware.telemetry.as_deref_mut() else {
            return;
        };
        let gear = self.gearbox.state();
        sink.put_bool(telemetry::LOW_GEAR, gear.gear == robotcore::Gear::Low);
        sink.put_bool(telemetry::AUTOMATIC_SHIFTING, gear.automatic);
        sink.put_bool(telemetry::SWITCHED_FRONT, self.state.facing == Facing::Back);
        if let Some(heading) = heading {
            sink.put_number(telemetry::ANGLE, heading);
        }
        let acceleration = finite_axes(self.hardware.motion.acceleration());
        if let Some([x, y, z]) = observe(&mut self.health.acceleration_lost, ACCELEROMETER, acceleration) {
            sink.put_number(telemetry::ACCELERATION_X, x);
            sink.put_number(telemetry::ACCELERATION_Y, y);
            sink.put_number(telemetry::ACCELERATION_Z, z);
        }
        if let Some(speed) = speed {
            sink.put_number(telemetry::SPEED, speed);
        }
        sink.put_bool(telemetry::STRAIGHT_DRIVING, self.state.straight_drive_active);
        sink.put_number(telemetry::HEADING_PID, self.heading_pid.output());
        sink.put_number(telemetry::STRAIGHT_DRIVE_PID, self.straight_pid.output());
    }
}

/// Operator turn request, turn-around first, then left, then right.
fn requested_turn(input: &ControlInput) -> Option<DriveMode> {
    if input.turn_around {
        Some(DriveMode::Turn180)
    } else if input.left_turn {
        Some(DriveMode::Turn90Left)
    } else if input.right_turn {
        Some(DriveMode::Turn90Right)
    } else {
        None
    }
}

impl Model for DriveController {
    fn reset(&mut self) {
        self.heading_pid.reset();
        self.straight_pid.reset();
        self.gearbox.reset();
        self.state = DriveState::default();
        self.hardware.relay.set(self.gearbox.gear());
        self.hardware.clock.reset();
        self.hardware.motors.set_left_right(0.0, 0.0);
    }
}
