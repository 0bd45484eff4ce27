//! Dashboard telemetry sinks

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;
use robotcore::TelemetrySink;
use serde::Serialize;

pub const LOW_GEAR: &str = "Low gear";
pub const AUTOMATIC_SHIFTING: &str = "Automatic shifting";
pub const SWITCHED_FRONT: &str = "Switched front";
pub const ANGLE: &str = "Angle";
pub const ACCELERATION_X: &str = "AccelerationX";
pub const ACCELERATION_Y: &str = "AccelerationY";
pub const ACCELERATION_Z: &str = "AccelerationZ";
pub const SPEED: &str = "Speed";
pub const STRAIGHT_DRIVING: &str = "Straight driving";
pub const HEADING_PID: &str = "PID";
pub const STRAIGHT_DRIVE_PID: &str = "Straight drive PID";

/// Writes every value to the `log` facade at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn put_number(&mut self, key: &str, value: f64) {
        trace!("{key}: {value:.3}");
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        trace!("{key}: {value}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Number(f64),
    Bool(bool),
}

/// Keeps the latest value per key. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTelemetry {
    values: Rc<RefCell<BTreeMap<String, TelemetryValue>>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<TelemetryValue> {
        self.values.borrow().get(key).copied()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(TelemetryValue::Number(v)) => Some(v),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(TelemetryValue::Bool(v)) => Some(v),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, TelemetryValue> {
        self.values.borrow().clone()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn put_number(&mut self, key: &str, value: f64) {
        self.values.borrow_mut().insert(key.to_owned(), TelemetryValue::Number(value));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.values.borrow_mut().insert(key.to_owned(), TelemetryValue::Bool(value));
    }
}
