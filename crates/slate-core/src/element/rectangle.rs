//! Rectangle element.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle, optionally rotated around its center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: ElementId::new(),
            position,
            width: sanitize_extent(width),
            height: sanitize_extent(height),
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self::new(
            Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            (p2.x - p1.x).abs(),
            (p2.y - p1.y).abs(),
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, Size::new(self.width, self.height))
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let rect = self.bounds();
        if self.style.fill.is_some() {
            // Filled: hit anywhere inside.
            rect.inflate(tolerance, tolerance).contains(point)
        } else {
            // Outline only: hit on the border ring.
            let pad = tolerance + self.style.stroke_width / 2.0;
            let outer = rect.inflate(pad, pad);
            let inner = rect.inflate(-pad, -pad);
            outer.contains(point) && !(inner.width() > 0.0 && inner.height() > 0.0 && inner.contains(point))
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes() {
        let rect = Rectangle::from_corners(Point::new(100.0, 100.0), Point::new(50.0, 60.0));
        assert_eq!(rect.position, Point::new(50.0, 60.0));
        assert!((rect.width - 50.0).abs() < f64::EPSILON);
        assert!((rect.height - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test_outline_only() {
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        // Border hits, interior misses.
        assert!(rect.hit_test(Point::new(0.0, 50.0), 2.0));
        assert!(!rect.hit_test(Point::new(50.0, 50.0), 2.0));
    }

    #[test]
    fn test_hit_test_filled() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        rect.style.fill = Some(super::super::Rgba::white());
        assert!(rect.hit_test(Point::new(50.0, 50.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 50.0), 0.0));
    }

    #[test]
    fn test_negative_size_clamped() {
        let rect = Rectangle::new(Point::new(0.0, 0.0), -20.0, f64::NAN);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
    }
}
