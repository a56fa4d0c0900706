//! Edges: connectors bound to element anchors.

use crate::element::{point_to_polyline_dist, Element, ElementId, ElementStyle};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for edges. Branded separately from [`ElementId`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named attachment point on an element's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl Anchor {
    /// All anchors, in the order snap candidates are considered.
    pub const ALL: [Anchor; 5] = [
        Anchor::Left,
        Anchor::Right,
        Anchor::Top,
        Anchor::Bottom,
        Anchor::Center,
    ];

    /// Resolve the anchor against a bounding box.
    pub fn resolve(self, bounds: Rect) -> Point {
        let center = bounds.center();
        match self {
            Anchor::Left => Point::new(bounds.x0, center.y),
            Anchor::Right => Point::new(bounds.x1, center.y),
            Anchor::Top => Point::new(center.x, bounds.y0),
            Anchor::Bottom => Point::new(center.x, bounds.y1),
            Anchor::Center => center,
        }
    }
}

/// Reference to a specific anchor of a specific element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorRef {
    pub element: ElementId,
    pub anchor: Anchor,
}

impl AnchorRef {
    pub fn new(element: ElementId, anchor: Anchor) -> Self {
        Self { element, anchor }
    }
}

/// The far end of an edge: anchored to an element, or a free point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EdgeEnd {
    Anchored(AnchorRef),
    Free(Point),
}

impl EdgeEnd {
    /// The element this end is anchored to, if any.
    pub fn element(&self) -> Option<ElementId> {
        match self {
            EdgeEnd::Anchored(anchor) => Some(anchor.element),
            EdgeEnd::Free(_) => None,
        }
    }
}

/// A routed connection between a source anchor and a target.
///
/// `points` is a cache derived from the current endpoint positions; the
/// connector engine rewrites it whenever a referenced element moves. It is
/// never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: AnchorRef,
    pub target: EdgeEnd,
    /// Cached routed polyline, first point at the source anchor, last at
    /// the target.
    pub points: Vec<Point>,
    pub style: ElementStyle,
}

impl Edge {
    /// Create an edge between a source anchor and a target end.
    pub fn new(source: AnchorRef, target: EdgeEnd) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            points: Vec::new(),
            style: ElementStyle::default(),
        }
    }

    /// Check whether this edge references the given element at either end.
    pub fn references(&self, element: ElementId) -> bool {
        self.source.element == element || self.target.element() == Some(element)
    }

    /// Re-derive the routed points from current element positions.
    ///
    /// Returns None when a referenced element is missing (the edge is
    /// stale and about to be severed).
    pub fn derive_points(&self, elements: &HashMap<ElementId, Element>) -> Option<Vec<Point>> {
        let source_bounds = elements.get(&self.source.element)?.bounds();
        let start = self.source.anchor.resolve(source_bounds);
        let end = match self.target {
            EdgeEnd::Anchored(anchor) => {
                anchor.anchor.resolve(elements.get(&anchor.element)?.bounds())
            }
            EdgeEnd::Free(point) => point,
        };
        Some(vec![start, end])
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
        rect
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        point_to_polyline_dist(point, &self.points)
            <= tolerance + self.style.stroke_width / 2.0
    }
}
