//! Arcade drive mixing.
//!
//! Combines one forward axis and one turn axis into left/right outputs in
//! [-1, 1] without rescaling: the faster side saturates instead of both sides
//! being normalized.

fn square_preserving_sign(value: f64) -> f64 {
    value * value.abs()
}

/// Mix `forward` and `turn` into `(left, right)` outputs.
///
/// Positive `turn` speeds up the right side relative to the left, which
/// increases heading.
pub fn arcade(forward: f64, turn: f64, square_inputs: bool) -> (f64, f64) {
    let mut forward = forward.clamp(-1.0, 1.0);
    let mut turn = turn.clamp(-1.0, 1.0);
    if square_inputs {
        forward = square_preserving_sign(forward);
        turn = square_preserving_sign(turn);
    }

    if forward > 0.0 {
        if turn > 0.0 {
            (forward - turn, forward.max(turn))
        } else {
            (forward.max(-turn), forward + turn)
        }
    } else if turn > 0.0 {
        (-(-forward).max(turn), forward + turn)
    } else {
        (forward - turn, -(-forward).max(-turn))
    }
}
