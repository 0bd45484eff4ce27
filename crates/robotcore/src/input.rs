use serde::{Deserialize, Serialize};

/// One cycle's worth of operator input.
///
/// Axes are normalized to [-1, 1]; `left_y` is positive when the stick is
/// pushed forward. Buttons report their level, not edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlInput {
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
    pub gear_switch: bool,
    pub left_turn: bool,
    pub right_turn: bool,
    pub turn_around: bool,
    pub switch_front: bool,
}

impl ControlInput {
    /// Sticks centered, no buttons held.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_sticks(left_y: f64, right_x: f64) -> Self {
        Self { left_y, right_x, ..Self::default() }
    }
}
