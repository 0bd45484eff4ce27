//! Reset-and-read timers backing the gear-shift interval.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::traits::Clock;

/// Wall-clock timer over [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }
}

/// Simulated time shared between a simulation loop and the clocks reading it.
#[derive(Debug, Clone, Default)]
pub struct SimTime(Rc<Cell<Duration>>);

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.0.get()
    }

    pub fn advance(&self, dt: Duration) {
        self.0.set(self.0.get() + dt);
    }

    pub fn advance_secs(&self, dt: f64) {
        self.advance(Duration::from_secs_f64(dt));
    }
}

/// Timer that only moves when its [`SimTime`] is advanced.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: SimTime,
    mark: Duration,
}

impl ManualClock {
    pub fn new(time: SimTime) -> Self {
        let mark = time.now();
        Self { time, mark }
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.time.now().saturating_sub(self.mark)
    }

    fn reset(&mut self) {
        self.mark = self.time.now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_follows_sim_time() {
        let time = SimTime::new();
        let mut clock = ManualClock::new(time.clone());
        time.advance_secs(0.3);
        assert_eq!(clock.elapsed(), Duration::from_secs_f64(0.3));

        clock.reset();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        time.advance(Duration::from_millis(20));
        assert_eq!(clock.elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn test_monotonic_clock_resets() {
        let mut clock = MonotonicClock::new();
        clock.reset();
        assert!(clock.elapsed() < Duration::from_secs(1));
    }
}
