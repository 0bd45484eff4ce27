//! Heading arithmetic on the [0, 360) circle.

pub const FULL_TURN: f64 = 360.0;
pub const HALF_TURN: f64 = 180.0;

/// Wraps any angle in degrees into [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Signed shortest rotation from `current` to `target`, in (-180, 180].
///
/// Positive means the target lies clockwise (increasing heading).
pub fn heading_error(current: f64, target: f64) -> f64 {
    let diff = normalize_degrees(target - current);
    if diff > HALF_TURN { diff - FULL_TURN } else { diff }
}
