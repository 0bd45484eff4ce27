//! Sensor error types

/// Errors reported by sensor adapters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    /// No hardware backs this sensor (absent or not yet initialized)
    #[error("{0} unavailable")]
    Unavailable(&'static str),

    /// Hardware answered with an unusable reading
    #[error("{sensor} returned invalid reading {value}")]
    InvalidReading {
        sensor: &'static str,
        value: f64,
    },
}

impl SensorError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SensorError::Unavailable(_))
    }
}
