//! Button debouncing.

/// Fires once on each released → pressed transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct RisingEdge {
    held: bool,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current button level; true only on the first pressed sample.
    pub fn update(&mut self, pressed: bool) -> bool {
        let fired = pressed && !self.held;
        self.held = pressed;
        fired
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}
