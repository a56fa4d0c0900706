//! Ellipse element. A circle is an ellipse with equal radii.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// An ellipse defined by center and radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ElementId,
    pub center: Point,
    pub radius_x: f64,
    pub radius_y: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl Ellipse {
    /// Create a new ellipse.
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: ElementId::new(),
            center,
            radius_x: sanitize_extent(radius_x),
            radius_y: sanitize_extent(radius_y),
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    /// Create an ellipse inscribed in a rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let rx = self.radius_x + tolerance + self.style.stroke_width / 2.0;
        let ry = self.radius_y + tolerance + self.style.stroke_width / 2.0;
        if rx <= 0.0 || ry <= 0.0 {
            return false;
        }
        let dx = (point.x - self.center.x) / rx;
        let dy = (point.y - self.center.y) / ry;
        let outer = dx * dx + dy * dy <= 1.0;
        if self.style.fill.is_some() {
            return outer;
        }
        // Outline only: outside the shrunken inner ellipse.
        let irx = self.radius_x - tolerance - self.style.stroke_width / 2.0;
        let iry = self.radius_y - tolerance - self.style.stroke_width / 2.0;
        if irx <= 0.0 || iry <= 0.0 {
            return outer;
        }
        let idx = (point.x - self.center.x) / irx;
        let idy = (point.y - self.center.y) / iry;
        outer && idx * idx + idy * idy >= 1.0
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }

    /// Resize, keeping the bounds origin (top-left) fixed.
    pub fn set_size(&mut self, size: Size) {
        let origin = Point::new(self.center.x - self.radius_x, self.center.y - self.radius_y);
        self.radius_x = size.width / 2.0;
        self.radius_y = size.height / 2.0;
        self.center = Point::new(origin.x + self.radius_x, origin.y + self.radius_y);
    }
}
