//! PID Controller on a wrapping heading input
//!
//! A gain triple plus state, instantiated once per closed loop. Error is the
//! shortest signed rotation to the setpoint, so the loop never takes the
//! long way around the 0/360 seam.

use robotcore::{Model, heading_error, normalize_degrees};
use serde::{Deserialize, Serialize};

/// Configuration for a PID controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain (per sample)
    pub ki: f64,
    /// Derivative gain (per sample)
    pub kd: f64,
    /// Minimum output value
    pub output_min: f64,
    /// Maximum output value
    pub output_max: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            output_min: -1.0,
            output_max: 1.0,
        }
    }
}

impl PidConfig {
    /// Create a PID controller config
    pub fn pid(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, ..Default::default() }
    }

    /// Gains for programmed turns (in place or while stopped)
    pub fn heading() -> Self {
        Self::pid(0.02, 0.02, 0.0)
    }

    /// Gains for holding a heading while driving forward
    pub fn straight_drive() -> Self {
        Self::pid(0.3, 0.0, 0.0)
    }

    /// Set output limits
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    /// Largest |integral| whose I-term still fits inside the output range
    fn integral_bound(&self) -> f64 {
        if self.ki == 0.0 {
            return 0.0;
        }
        self.output_max.abs().max(self.output_min.abs()) / self.ki.abs()
    }

    pub(crate) fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd, self.output_min, self.output_max]
            .iter()
            .all(|v| v.is_finite())
            && self.output_min < self.output_max
    }
}

/// PID Controller with state
#[derive(Debug, Clone)]
pub struct PidController {
    config: PidConfig,
    setpoint: f64,
    enabled: bool,
    integral: f64,
    last_error: Option<f64>,
    last_output: f64,
}

impl PidController {
    /// Create a new, disabled controller with the given configuration
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            setpoint: 0.0,
            enabled: false,
            integral: 0.0,
            last_error: None,
            last_output: 0.0,
        }
    }

    /// Set the target heading. Does not enable the controller.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = normalize_degrees(setpoint);
    }

    /// Get the current setpoint
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Set the setpoint and enable in one call
    pub fn enable_at(&mut self, setpoint: f64) {
        self.set_setpoint(setpoint);
        self.enable();
    }

    /// Stop computing and drop any residual output.
    ///
    /// A no-op when already disabled: setpoint and accumulated state are kept.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run one sample and return the correction. Returns 0 while disabled.
    pub fn step(&mut self, measurement: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let error = heading_error(measurement, self.setpoint);

        let p_term = self.config.kp * error;

        // Anti-windup: clamp integral so the I-term alone cannot exceed the output range
        let bound = self.config.integral_bound();
        self.integral = (self.integral + error).clamp(-bound, bound);
        let i_term = self.config.ki * self.integral;

        let d_term = match self.last_error {
            Some(prev) => self.config.kd * (error - prev),
            None => 0.0,
        };
        self.last_error = Some(error);

        let output = (p_term + i_term + d_term).clamp(self.config.output_min, self.config.output_max);
        self.last_output = output;
        output
    }

    /// Error at the most recent step, if any
    pub fn error(&self) -> Option<f64> {
        self.last_error
    }

    /// Output of the most recent step (0 after disabling)
    pub fn output(&self) -> f64 {
        self.last_output
    }

    /// Get the current integral accumulator value
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    fn clear(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
        self.last_output = 0.0;
    }
}

impl Model for PidController {
    fn reset(&mut self) {
        self.enabled = false;
        self.clear();
    }
}
