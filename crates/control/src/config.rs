//! Drive controller configuration
//!
//! Tuning constants live here rather than in the control code so a robot can
//! be retuned from a JSON file. Every field has a default; a file only needs
//! to list what it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gearbox::GearConfig;
use crate::pid::PidConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not read the config file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Drive controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Gains for programmed turns
    pub heading_pid: PidConfig,
    /// Gains for heading hold while driving straight
    pub straight_pid: PidConfig,
    /// Fraction of the remaining gap the forward ramp closes each cycle, in (0, 1]
    pub ramp_factor: f64,
    /// |left_y| above which straight drive may engage
    pub straight_forward_deadband: f64,
    /// |right_x| below which straight drive may engage
    pub straight_turn_deadband: f64,
    /// |right_x| above which the driver cancels a programmed turn
    pub turn_override_deadband: f64,
    /// Heading drift (deg) tolerated before straight drive corrects
    pub straight_tolerance: f64,
    /// Heading error (deg) at which `turn_to` reports arrival
    pub on_target_tolerance: f64,
    /// When set, operator-requested turns finish once within this many degrees.
    /// When unset they hold the target until the driver overrides.
    pub turn_complete_tolerance: Option<f64>,
    /// Square stick values before arcade mixing
    pub square_inputs: bool,
    pub gear: GearConfig,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            heading_pid: PidConfig::heading(),
            straight_pid: PidConfig::straight_drive(),
            ramp_factor: 0.5,
            straight_forward_deadband: 0.15,
            straight_turn_deadband: 0.15,
            turn_override_deadband: 0.12,
            straight_tolerance: 2.0,
            on_target_tolerance: 0.5,
            turn_complete_tolerance: None,
            square_inputs: false,
            gear: GearConfig::default(),
        }
    }
}

impl DriveConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: DriveConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.heading_pid.is_valid() {
            return Err(invalid("heading_pid", "gains must be finite and output_min < output_max"));
        }
        if !self.straight_pid.is_valid() {
            return Err(invalid("straight_pid", "gains must be finite and output_min < output_max"));
        }
        if !(self.ramp_factor > 0.0 && self.ramp_factor <= 1.0) {
            return Err(invalid("ramp_factor", format!("{} not in (0, 1]", self.ramp_factor)));
        }
        let non_negative = [
            ("straight_forward_deadband", self.straight_forward_deadband),
            ("straight_turn_deadband", self.straight_turn_deadband),
            ("turn_override_deadband", self.turn_override_deadband),
            ("straight_tolerance", self.straight_tolerance),
            ("on_target_tolerance", self.on_target_tolerance),
            ("gear.shift_interval", self.gear.shift_interval),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, format!("{value} must be finite and non-negative")));
            }
        }
        if !(self.gear.shifting_speed.is_finite() && self.gear.shifting_speed > 0.0) {
            return Err(invalid("gear.shifting_speed", "must be positive"));
        }
        if let Some(tolerance) = self.turn_complete_tolerance {
            if !(tolerance.is_finite() && tolerance > 0.0) {
                return Err(invalid("turn_complete_tolerance", "must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DriveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.heading_pid.kp, 0.02);
        assert_eq!(config.straight_pid.kp, 0.3);
        assert_eq!(config.gear.shifting_speed, 2.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DriveConfig::from_json_str(
            r#"{ "ramp_factor": 0.25, "gear": { "shifting_speed": 1.75 } }"#,
        )
        .unwrap();
        assert_eq!(config.ramp_factor, 0.25);
        assert_eq!(config.gear.shifting_speed, 1.75);
        assert_eq!(config.gear.shift_interval, 0.5);
        assert_eq!(config.turn_override_deadband, 0.12);
    }

    #[test]
    fn test_rejects_zero_ramp() {
        let err = DriveConfig::from_json_str(r#"{ "ramp_factor": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ramp_factor", .. }));
    }

    #[test]
    fn test_rejects_inverted_output_limits() {
        let mut config = DriveConfig::default();
        config.heading_pid = config.heading_pid.with_limits(1.0, -1.0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "heading_pid", .. })));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = DriveConfig::from_json_str("{ ramp_factor: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DriveConfig::from_json_file("/nonexistent/drive.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
