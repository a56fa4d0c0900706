//! Viewport: the pan/zoom transform between world and screen space.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum allowed zoom scale.
pub const MIN_SCALE: f64 = 0.1;
/// Maximum allowed zoom scale.
pub const MAX_SCALE: f64 = 10.0;

/// The view transform for one canvas.
///
/// Converts between screen coordinates (host pixels) and world
/// coordinates (element space). Scale is always clamped to
/// [`MIN_SCALE`]..=[`MAX_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan), in screen units.
    pub offset: Vec2,
    /// Current zoom scale.
    pub scale: f64,
    /// Viewport size in screen units.
    pub size: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            size: Size::new(800.0, 600.0),
        }
    }
}

impl Viewport {
    /// Create a viewport of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Get the affine transform from world to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Get the inverse transform, from screen to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.transform() * world
    }

    /// The world-space rectangle currently visible.
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right =
            self.screen_to_world(Point::new(self.size.width, self.size.height));
        Rect::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Set the scale directly, clamped. Non-finite values clamp to 1.0.
    pub fn set_scale(&mut self, scale: f64) {
        let scale = if scale.is_finite() { scale } else { 1.0 };
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Zoom by a factor, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if !new_scale.is_finite() || (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let world = self.screen_to_world(screen);
        self.scale = new_scale;

        // Adjust the offset so `world` stays under the cursor.
        let moved = self.world_to_screen(world);
        self.offset += Vec2::new(screen.x - moved.x, screen.y - moved.y);
    }

    /// Fit the view to show the given world bounds with padding.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() {
            self.offset = Vec2::ZERO;
            self.scale = 1.0;
            return;
        }

        let padded = Size::new(
            (self.size.width - padding * 2.0).max(1.0),
            (self.size.height - padding * 2.0).max(1.0),
        );
        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.scale = scale_x.min(scale_y).clamp(MIN_SCALE, MAX_SCALE);

        let bounds_center = bounds.center();
        let view_center = Point::new(self.size.width / 2.0, self.size.height / 2.0);
        self.offset = Vec2::new(
            view_center.x - bounds_center.x * self.scale,
            view_center.y - bounds_center.y * self.scale,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let viewport = Viewport::default();
        let p = Point::new(123.0, 456.0);
        assert_eq!(viewport.world_to_screen(p), p);
    }

    #[test]
    fn test_screen_to_world_with_pan_and_zoom() {
        let mut viewport = Viewport::default();
        viewport.offset = Vec2::new(50.0, 100.0);
        viewport.scale = 2.0;
        let world = viewport.screen_to_world(Point::new(150.0, 300.0));
        assert!((world.x - 50.0).abs() < 1e-12);
        assert!((world.y - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip() {
        let mut viewport = Viewport::default();
        viewport.offset = Vec2::new(30.0, -20.0);
        viewport.scale = 1.5;

        let original = Point::new(77.0, -13.0);
        let back = viewport.world_to_screen(viewport.screen_to_world(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_scale_clamped() {
        let mut viewport = Viewport::default();
        viewport.zoom_at(Point::ZERO, 0.0001);
        assert!((viewport.scale - MIN_SCALE).abs() < f64::EPSILON);

        viewport.scale = 1.0;
        viewport.zoom_at(Point::ZERO, 1000.0);
        assert!((viewport.scale - MAX_SCALE).abs() < f64::EPSILON);

        viewport.set_scale(f64::NAN);
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_keeps_cursor_fixed() {
        let mut viewport = Viewport::default();
        let cursor = Point::new(400.0, 300.0);
        let world_before = viewport.screen_to_world(cursor);
        viewport.zoom_at(cursor, 2.0);
        let world_after = viewport.screen_to_world(cursor);
        assert!((world_before.x - world_after.x).abs() < 1e-10);
        assert!((world_before.y - world_after.y).abs() < 1e-10);
    }

    #[test]
    fn test_fit_to_bounds_centers() {
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        viewport.fit_to_bounds(Rect::new(0.0, 0.0, 400.0, 300.0), 50.0);
        let center = viewport.world_to_screen(Point::new(200.0, 150.0));
        assert!((center.x - 400.0).abs() < 1e-9);
        assert!((center.y - 300.0).abs() < 1e-9);
    }
}
