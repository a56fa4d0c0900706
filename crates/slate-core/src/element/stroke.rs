//! Freehand stroke element.

use super::{point_to_polyline_dist, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// A freehand polyline captured from pointer movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: ElementId,
    /// Ordered sample points in world coordinates.
    pub points: Vec<Point>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl Stroke {
    /// Create a stroke from captured points.
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            id: ElementId::new(),
            points,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    /// Append a sample point.
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect = rect.union_pt(*p);
        }
        let half = self.style.stroke_width / 2.0;
        rect.inflate(half, half)
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.points.is_empty() {
            return false;
        }
        point_to_polyline_dist(point, &self.points)
            <= tolerance + self.style.stroke_width / 2.0
    }

    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }

    /// Resize by scaling all points inside the current bounds.
    pub fn set_size(&mut self, size: Size) {
        if self.points.is_empty() {
            return;
        }
        let bounds = self.bounds();
        let sx = size.width / bounds.width().max(f64::EPSILON);
        let sy = size.height / bounds.height().max(f64::EPSILON);
        let origin = bounds.origin();
        for p in &mut self.points {
            p.x = origin.x + (p.x - origin.x) * sx;
            p.y = origin.y + (p.y - origin.y) * sy;
        }
    }
}
