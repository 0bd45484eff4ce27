//! Analog ultrasonic range finder adapter.

use crate::error::SensorError;
use crate::traits::RangeSource;

/// Inches per volt of the analog sonar output (512 counts over 5 V).
pub const SONAR_INCHES_PER_VOLT: f64 = 512.0 / 5.0;

/// Converts a sonar voltage to whole inches; rounding drops sensor noise.
pub fn sonar_distance(voltage: f64) -> f64 {
    (voltage * SONAR_INCHES_PER_VOLT).round()
}

/// [`RangeSource`] over any analog voltage reader.
pub struct AnalogSonar<F> {
    read_voltage: F,
}

impl<F> AnalogSonar<F>
where
    F: Fn() -> Result<f64, SensorError>,
{
    pub fn new(read_voltage: F) -> Self {
        Self { read_voltage }
    }
}

impl<F> RangeSource for AnalogSonar<F>
where
    F: Fn() -> Result<f64, SensorError>,
{
    fn distance(&self) -> Result<f64, SensorError> {
        let voltage = (self.read_voltage)()?;
        if !voltage.is_finite() || voltage < 0.0 {
            return Err(SensorError::InvalidReading { sensor: "sonar", value: voltage });
        }
        Ok(sonar_distance(voltage))
    }
}
