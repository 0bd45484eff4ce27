//! Headless drivetrain session runner
//!
//! Usage: `drive-sim-app [session.json]`
//!
//! Without a config file the built-in demo script runs: full-speed straight
//! driving through an automatic upshift, a right turn cancelled by the driver,
//! reversed driving with a gyro dropout, then an autonomous turn back to zero.
//! The end-of-session summary is printed to stdout as JSON; logs go to stderr.

mod session;

use std::process::ExitCode;

use log::info;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use session::{SessionConfig, SessionError, run_session};

fn run() -> Result<(), SessionError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    let level = config.logging.level_filter()?;
    TermLogger::init(
        level,
        ConfigBuilder::new().set_target_level(log::LevelFilter::Debug).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    info!(
        "Running {} phases at {:.0} ms per cycle",
        config.script.len(),
        config.sim.dt * 1000.0
    );
    let summary = run_session(&config)?;
    info!(
        "Finished after {:.2} s at ({:.2}, {:.2}) heading {:.1}",
        summary.seconds, summary.x, summary.y, summary.heading
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
