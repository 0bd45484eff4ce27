//! Closed-loop teleop runs against the simulated tank drivetrain.

use std::cell::RefCell;
use std::rc::Rc;

use control::telemetry::{ANGLE, LOW_GEAR, SPEED, SWITCHED_FRONT};
use control::{DriveConfig, DriveController, DriveHardware, DriveMode, MemoryTelemetry, PidConfig};
use mechanics::{
    SharedDrivetrain, SimAccelerometer, SimGearbox, SimGyro, SimMotors, TankDrivetrain,
    TankDrivetrainConfig,
};
use robotcore::{ControlInput, Gear, HeadingSource, ManualClock, SimContext, SimTime, heading_error};

const DT: f64 = 0.02;

struct Session {
    plant: SharedDrivetrain,
    time: SimTime,
    controller: DriveController,
    telemetry: MemoryTelemetry,
}

impl Session {
    fn new(config: DriveConfig, plant_config: TankDrivetrainConfig) -> Self {
        let plant = Rc::new(RefCell::new(TankDrivetrain::new(plant_config)));
        let time = SimTime::new();
        let telemetry = MemoryTelemetry::new();
        let hardware = DriveHardware {
            heading: Box::new(SimGyro::new(plant.clone())),
            motion: Box::new(SimAccelerometer::new(plant.clone())),
            motors: Box::new(SimMotors::new(plant.clone())),
            relay: Box::new(SimGearbox::new(plant.clone())),
            clock: Box::new(ManualClock::new(time.clone())),
            telemetry: Some(Box::new(telemetry.clone())),
        };
        let controller = DriveController::new(config, hardware).unwrap();
        Session {
            plant,
            time,
            controller,
            telemetry,
        }
    }

    fn default_plant(config: DriveConfig) -> Self {
        Self::new(config, TankDrivetrainConfig::default())
    }

    fn advance(&mut self) {
        let t = self.time.now().as_secs_f64();
        self.plant.borrow_mut().step_physics(SimContext { dt: DT, t });
        self.time.advance_secs(DT);
    }

    fn cycle(&mut self, input: &ControlInput) {
        self.controller.step(input);
        self.advance();
    }

    fn heading(&self) -> f64 {
        self.plant.borrow().pose().heading
    }

    fn deviation_from(&self, target: f64) -> f64 {
        heading_error(self.heading(), target).abs()
    }
}

fn weak_right_side() -> TankDrivetrainConfig {
    TankDrivetrainConfig {
        right_side_efficiency: 0.9,
        ..TankDrivetrainConfig::default()
    }
}

fn p_only_turns() -> DriveConfig {
    DriveConfig {
        heading_pid: PidConfig::pid(0.02, 0.0, 0.0),
        ..DriveConfig::default()
    }
}

#[test]
fn test_straight_drive_holds_heading_on_weak_side() {
    let mut session = Session::new(DriveConfig::default(), weak_right_side());
    let input = ControlInput::with_sticks(0.5, 0.0);
    let mut worst = 0.0_f64;
    for _ in 0..150 {
        session.cycle(&input);
        worst = worst.max(session.deviation_from(0.0));
    }
    assert_eq!(session.controller.mode(), DriveMode::StraightDrive);
    assert!(worst < 5.0, "drifted {worst:.2} deg");
    assert!(session.plant.borrow().pose().position.y > 2.0);
}

#[test]
fn test_open_loop_drifts_on_weak_side() {
    let mut session = Session::new(DriveConfig::default(), weak_right_side());
    for _ in 0..150 {
        session.controller.drive_tank(0.5, 0.5);
        session.advance();
    }
    assert!(session.deviation_from(0.0) > 20.0);
}

#[test]
fn test_turn_to_reaches_target() {
    let mut session = Session::default_plant(p_only_turns());
    let mut finished = None;
    for cycle in 0..100 {
        if !session.controller.turn_to(90.0) {
            finished = Some(cycle);
            break;
        }
        session.advance();
    }
    let cycle = finished.expect("turn never finished");
    assert!(cycle > 5);
    assert!(session.deviation_from(90.0) <= 0.5);
    assert_eq!(session.controller.mode(), DriveMode::ManualArcade);
    assert!(!session.controller.heading_pid().is_enabled());
}

#[test]
fn test_right_turn_button_settles_on_target() {
    let mut session = Session::default_plant(p_only_turns());
    session.cycle(&ControlInput {
        right_turn: true,
        ..ControlInput::idle()
    });
    assert_eq!(session.controller.mode(), DriveMode::Turn90Right);

    for _ in 0..200 {
        session.cycle(&ControlInput::idle());
    }
    // Without a completion tolerance the turn holds its target
    assert_eq!(session.controller.mode(), DriveMode::Turn90Right);
    assert!(session.deviation_from(90.0) < 0.5);
}

#[test]
fn test_driver_stick_cancels_turn() {
    let mut session = Session::default_plant(DriveConfig::default());
    session.cycle(&ControlInput {
        turn_around: true,
        ..ControlInput::idle()
    });
    assert_eq!(session.controller.mode(), DriveMode::Turn180);

    session.cycle(&ControlInput::with_sticks(0.0, 0.5));
    assert_eq!(session.controller.mode(), DriveMode::ManualArcade);
    assert_eq!(session.plant.borrow().command(), [-0.5, 0.5]);
}

#[test]
fn test_automatic_shifting_follows_speed() {
    let mut session = Session::default_plant(DriveConfig::default());
    let mut shifts = Vec::new();
    let mut gear = session.plant.borrow().gear();
    let full = ControlInput::with_sticks(1.0, 0.0);
    let idle = ControlInput::idle();

    for cycle in 0..400 {
        let t = session.time.now().as_secs_f64();
        session.cycle(if cycle < 200 { &full } else { &idle });
        let now = session.plant.borrow().gear();
        if now != gear {
            shifts.push((t, now));
            gear = now;
        }
    }

    assert_eq!(shifts.len(), 2, "{shifts:?}");
    let (up_at, up) = shifts[0];
    let (down_at, down) = shifts[1];
    assert_eq!(up, Gear::Off);
    assert_eq!(down, Gear::Low);
    assert!((0.5..0.6).contains(&up_at), "shifted up at {up_at}");
    assert!(down_at > 4.0 && down_at < 4.5, "shifted down at {down_at}");
    assert_eq!(session.telemetry.flag(LOW_GEAR), Some(true));
}

#[test]
fn test_gear_switch_holds_gear_while_manual() {
    let mut session = Session::default_plant(DriveConfig::default());
    let press = ControlInput {
        gear_switch: true,
        ..ControlInput::idle()
    };
    session.cycle(&press);
    session.cycle(&press);
    assert_eq!(session.plant.borrow().gear(), Gear::Off);
    assert_eq!(session.plant.borrow().shifts(), 1);

    // Manual mode ignores speed
    for _ in 0..100 {
        session.cycle(&ControlInput::idle());
    }
    assert_eq!(session.plant.borrow().gear(), Gear::Off);
    assert!(!session.controller.gear_state().automatic);
}

#[test]
fn test_drives_without_gyro() {
    let mut session = Session::default_plant(DriveConfig::default());
    session.plant.borrow_mut().links.gyro = false;
    let input = ControlInput::with_sticks(0.5, 0.0);
    for _ in 0..50 {
        session.cycle(&input);
    }
    assert_eq!(session.controller.mode(), DriveMode::ManualArcade);
    assert!(session.plant.borrow().pose().position.y > 0.5);
    assert_eq!(session.telemetry.number(ANGLE), None);
    assert!(session.telemetry.number(SPEED).unwrap() > 1.0);

    // Heading returns and straight drive resumes
    session.plant.borrow_mut().links.gyro = true;
    session.cycle(&input);
    assert_eq!(session.controller.mode(), DriveMode::StraightDrive);
    let gyro = SimGyro::new(session.plant.clone());
    assert_eq!(session.telemetry.number(ANGLE), gyro.heading().ok());
}

#[test]
fn test_direction_switch_reverses_travel() {
    let mut session = Session::default_plant(DriveConfig::default());
    session.cycle(&ControlInput {
        switch_front: true,
        ..ControlInput::idle()
    });
    assert_eq!(session.telemetry.flag(SWITCHED_FRONT), Some(true));

    let input = ControlInput::with_sticks(0.5, 0.0);
    for _ in 0..50 {
        session.cycle(&input);
    }
    assert!(session.plant.borrow().pose().position.y < -0.5);
    assert!(session.plant.borrow().speed() < 0.0);
}
