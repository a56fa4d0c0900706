//! Free-floating connector element.
//!
//! Created when a connector draft is committed without a snap target: the
//! line keeps its drawn endpoints but is not bound to any element. Bound
//! connectors are [`Edge`](crate::edge::Edge)s, a separate entity.

use super::{point_to_polyline_dist, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// A connector line that is not attached to any element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub(crate) id: ElementId,
    /// Routed points, at least two.
    pub points: Vec<Point>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl Connector {
    /// Create a two-point connector.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: ElementId::new(),
            points: vec![start, end],
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    pub fn start(&self) -> Point {
        self.points.first().copied().unwrap_or(Point::ZERO)
    }

    pub fn end(&self) -> Point {
        self.points.last().copied().unwrap_or(Point::ZERO)
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
        if self.points.len() < 2 {
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
