//! Pointer input types and double-click detection.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Double-click detection window.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
/// Maximum pointer travel between the two clicks of a double-click.
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Detects double-clicks from a stream of pointer-down events.
#[derive(Debug, Default)]
pub struct ClickTracker {
    last: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a click; returns true when it completes a double-click.
    pub fn register(&mut self, position: Point) -> bool {
        let now = Instant::now();
        let is_double = self.last.is_some_and(|(time, point)| {
            now.duration_since(time).as_millis() <= DOUBLE_CLICK_TIME_MS
                && (position - point).hypot() <= DOUBLE_CLICK_DISTANCE
        });
        // A completed double-click resets the chain so a triple click
        // does not read as two doubles.
        self.last = if is_double { None } else { Some((now, position)) };
        is_double
    }
}
