//! Two-speed gearbox state machine
//!
//! Automatic mode shifts on speed with a minimum dwell between shifts.
//! Manual mode holds whatever gear the driver left it in.

use log::info;
use robotcore::{Clock, Gear, Model};
use serde::{Deserialize, Serialize};

/// Shift thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    /// |speed| above which automatic mode leaves low gear
    pub shifting_speed: f64,
    /// Minimum seconds between automatic shifts
    pub shift_interval: f64,
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            shifting_speed: 2.0,
            shift_interval: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GearState {
    pub gear: Gear,
    pub automatic: bool,
}

impl Default for GearState {
    fn default() -> Self {
        Self {
            gear: Gear::Low,
            automatic: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gearbox {
    config: GearConfig,
    state: GearState,
}

impl Gearbox {
    pub fn new(config: GearConfig) -> Self {
        Self {
            config,
            state: GearState::default(),
        }
    }

    pub fn state(&self) -> GearState {
        self.state
    }

    pub fn gear(&self) -> Gear {
        self.state.gear
    }

    pub fn is_automatic(&self) -> bool {
        self.state.automatic
    }

    /// Handle one debounced press of the gear switch.
    ///
    /// Leaving automatic mode shifts once to the other gear; returning to
    /// automatic does not shift. Returns the new gear when a shift happened.
    pub fn toggle_automatic(&mut self) -> Option<Gear> {
        let shifted = if self.state.automatic {
            Some(self.shift_to(self.state.gear.toggled()))
        } else {
            None
        };
        self.state.automatic = !self.state.automatic;
        info!(
            "Gear switch: {} shifting",
            if self.state.automatic { "automatic" } else { "manual" }
        );
        shifted
    }

    /// Evaluate the automatic shift rule for one cycle.
    ///
    /// Does nothing in manual mode. The clock is reset on every automatic shift.
    pub fn update(&mut self, speed: f64, clock: &mut dyn Clock) -> Option<Gear> {
        if !self.state.automatic {
            return None;
        }
        let target = if speed.abs() > self.config.shifting_speed {
            Gear::Off
        } else {
            Gear::Low
        };
        if target == self.state.gear || clock.elapsed().as_secs_f64() < self.config.shift_interval {
            return None;
        }
        clock.reset();
        Some(self.shift_to(target))
    }

    fn shift_to(&mut self, gear: Gear) -> Gear {
        info!("Shifting {:?} -> {:?}", self.state.gear, gear);
        self.state.gear = gear;
        gear
    }
}

impl Model for Gearbox {
    fn reset(&mut self) {
        self.state = GearState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use robotcore::{ManualClock, SimTime};

    fn setup() -> (Gearbox, SimTime, ManualClock) {
        let time = SimTime::new();
        let clock = ManualClock::new(time.clone());
        (Gearbox::new(GearConfig::default()), time, clock)
    }

    #[test]
    fn test_starts_low_and_automatic() {
        let gearbox = Gearbox::new(GearConfig::default());
        assert_eq!(gearbox.gear(), Gear::Low);
        assert!(gearbox.is_automatic());
    }

    #[test]
    fn test_no_shift_before_interval() {
        let (mut gearbox, time, mut clock) = setup();
        time.advance_secs(0.3);
        assert_eq!(gearbox.update(2.5, &mut clock), None);
        assert_eq!(gearbox.gear(), Gear::Low);

        time.advance_secs(0.2);
        assert_eq!(gearbox.update(2.5, &mut clock), Some(Gear::Off));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let (mut gearbox, time, mut clock) = setup();
        time.advance_secs(1.0);
        assert_eq!(gearbox.update(2.0, &mut clock), None);
        assert_eq!(gearbox.update(-2.01, &mut clock), Some(Gear::Off));
    }

    #[test]
    fn test_downshift_waits_for_interval() {
        let (mut gearbox, time, mut clock) = setup();
        time.advance_secs(0.6);
        gearbox.update(3.0, &mut clock);
        assert_eq!(gearbox.gear(), Gear::Off);

        time.advance_secs(0.1);
        assert_eq!(gearbox.update(0.5, &mut clock), None);
        time.advance_secs(0.4);
        assert_eq!(gearbox.update(0.5, &mut clock), Some(Gear::Low));
    }

    #[test]
    fn test_speed_ramp_shifts_at_first_eligible_cycle() {
        // 0 -> 3.0 over 1 s at 20 ms cycles
        let (mut gearbox, time, mut clock) = setup();
        let mut shifted_at = None;
        for cycle in 0..=50 {
            let t = cycle as f64 * 0.02;
            let speed = 3.0 * t;
            if gearbox.update(speed, &mut clock).is_some() && shifted_at.is_none() {
                shifted_at = Some(t);
            }
            time.advance_secs(0.02);
        }
        let t = shifted_at.expect("should shift");
        // speed passes 2.0 at t = 0.667 s, already past the 0.5 s dwell
        assert!(t > 0.66 && t < 0.70, "shifted at {t}");
        assert_eq!(gearbox.gear(), Gear::Off);
    }

    #[test]
    fn test_shifts_respect_interval_for_any_trajectory() {
        let (mut gearbox, time, mut clock) = setup();
        let mut rng = StdRng::seed_from_u64(2014);
        let mut last_shift: Option<f64> = None;
        let mut shifts = 0;
        for cycle in 0..5000 {
            let t = cycle as f64 * 0.02;
            let speed = rng.gen_range(-4.0..4.0);
            if gearbox.update(speed, &mut clock).is_some() {
                if let Some(prev) = last_shift {
                    assert!(t - prev >= 0.5 - 1e-9, "shifts at {prev} and {t}");
                }
                last_shift = Some(t);
                shifts += 1;
            }
            time.advance_secs(0.02);
        }
        assert!(shifts > 10);
    }

    #[test]
    fn test_switch_leaves_automatic_with_one_shift() {
        let (mut gearbox, time, mut clock) = setup();
        assert_eq!(gearbox.toggle_automatic(), Some(Gear::Off));
        assert!(!gearbox.is_automatic());

        // Manual mode ignores speed entirely
        time.advance_secs(5.0);
        assert_eq!(gearbox.update(0.0, &mut clock), None);
        assert_eq!(gearbox.gear(), Gear::Off);

        // Back to automatic without shifting
        assert_eq!(gearbox.toggle_automatic(), None);
        assert!(gearbox.is_automatic());
        assert_eq!(gearbox.gear(), Gear::Off);
        assert_eq!(gearbox.update(0.0, &mut clock), Some(Gear::Low));
    }
}
