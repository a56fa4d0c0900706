//! Element definitions for the canvas.

mod connector;
mod ellipse;
mod image;
mod rectangle;
mod sticky;
mod stroke;
mod table;
mod text;

pub use connector::Connector;
pub use ellipse::Ellipse;
pub use image::ImageBox;
pub use rectangle::Rectangle;
pub use sticky::StickyNote;
pub use stroke::Stroke;
pub use table::{Table, TableCell};
pub use text::TextBox;

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for elements.
///
/// A dedicated newtype rather than a bare [`Uuid`] so element, edge and
/// group identifiers cannot be mixed up at call sites.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Generate a fresh identifier. Ids are never reused within a session.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier shared by all members of a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Generate a fresh group identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<Rgba> for Color {
    fn from(color: Rgba) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties shared by all element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    /// Stroke color.
    pub stroke: Rgba,
    /// Stroke width in world units.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill: Option<Rgba>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba::black(),
            stroke_width: 2.0,
            fill: None,
            opacity: 1.0,
        }
    }
}

impl ElementStyle {
    /// Get the stroke color as a peniko Color.
    pub fn stroke_color(&self) -> Color {
        self.stroke.into()
    }

    /// Get the fill color as a peniko Color.
    pub fn fill_color(&self) -> Option<Color> {
        self.fill.map(|c| c.into())
    }
}

/// Clamp an extent (width, height, radius) to a finite non-negative value.
///
/// Geometry is sanitized rather than rejected so a bad input event never
/// leaves the store in a state the renderer cannot draw.
pub fn sanitize_extent(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Clamp a coordinate to a finite value.
pub fn sanitize_coord(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Distance from a point to a line segment (a-b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    if points.len() == 1 {
        return (point - points[0]).hypot();
    }
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// A partial update applied to an element's common fields.
///
/// Continuous gestures send a stream of these with history recording
/// suspended; the finalizing call commits the net effect as one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    /// Some(None) clears the group, Some(Some(id)) assigns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Option<GroupId>>,
    /// Some(None) detaches from the container, Some(Some(id)) attaches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<Option<ElementId>>,
}

impl ElementPatch {
    /// Patch that moves the element so its bounds origin lands at (x, y).
    pub fn move_to(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes the element.
    pub fn resize(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Check whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Enum wrapper for all element kinds.
///
/// A closed union: adding a kind is a compile error everywhere it is not
/// yet handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Text(TextBox),
    Sticky(StickyNote),
    Image(ImageBox),
    Table(Table),
    Stroke(Stroke),
    Connector(Connector),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Rectangle(e) => e.id,
            Element::Ellipse(e) => e.id,
            Element::Text(e) => e.id,
            Element::Sticky(e) => e.id,
            Element::Image(e) => e.id,
            Element::Table(e) => e.id,
            Element::Stroke(e) => e.id,
            Element::Connector(e) => e.id,
        }
    }

    /// Get the bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Rectangle(e) => e.bounds(),
            Element::Ellipse(e) => e.bounds(),
            Element::Text(e) => e.bounds(),
            Element::Sticky(e) => e.bounds(),
            Element::Image(e) => e.bounds(),
            Element::Table(e) => e.bounds(),
            Element::Stroke(e) => e.bounds(),
            Element::Connector(e) => e.bounds(),
        }
    }

    /// Check if a point (in world coordinates) hits this element.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Element::Rectangle(e) => e.hit_test(point, tolerance),
            Element::Ellipse(e) => e.hit_test(point, tolerance),
            Element::Text(e) => e.hit_test(point, tolerance),
            Element::Sticky(e) => e.hit_test(point, tolerance),
            Element::Image(e) => e.hit_test(point, tolerance),
            Element::Table(e) => e.hit_test(point, tolerance),
            Element::Stroke(e) => e.hit_test(point, tolerance),
            Element::Connector(e) => e.hit_test(point, tolerance),
        }
    }

    /// Move the element by a delta in world coordinates.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Element::Rectangle(e) => e.translate(delta),
            Element::Ellipse(e) => e.translate(delta),
            Element::Text(e) => e.translate(delta),
            Element::Sticky(e) => e.translate(delta),
            Element::Image(e) => e.translate(delta),
            Element::Table(e) => e.translate(delta),
            Element::Stroke(e) => e.translate(delta),
            Element::Connector(e) => e.translate(delta),
        }
    }

    /// Move the element so its bounds origin lands at `position`.
    pub fn set_position(&mut self, position: Point) {
        let origin = self.bounds().origin();
        self.translate(position - origin);
    }

    /// Resize the element, keeping its bounds origin fixed.
    pub fn set_size(&mut self, size: Size) {
        let size = Size::new(sanitize_extent(size.width), sanitize_extent(size.height));
        match self {
            Element::Rectangle(e) => e.set_size(size),
            Element::Ellipse(e) => e.set_size(size),
            Element::Text(e) => e.set_size(size),
            Element::Sticky(e) => e.set_size(size),
            Element::Image(e) => e.set_size(size),
            Element::Table(e) => e.set_size(size),
            Element::Stroke(e) => e.set_size(size),
            Element::Connector(e) => e.set_size(size),
        }
    }

    /// Get the rotation angle in radians (0 for kinds without rotation).
    pub fn rotation(&self) -> f64 {
        match self {
            Element::Rectangle(e) => e.rotation,
            Element::Ellipse(e) => e.rotation,
            Element::Text(e) => e.rotation,
            Element::Sticky(e) => e.rotation,
            Element::Image(e) => e.rotation,
            Element::Table(e) => e.rotation,
            Element::Stroke(_) | Element::Connector(_) => 0.0,
        }
    }

    /// Set the rotation angle in radians. No-op for kinds without rotation.
    pub fn set_rotation(&mut self, rotation: f64) {
        let rotation = sanitize_coord(rotation);
        match self {
            Element::Rectangle(e) => e.rotation = rotation,
            Element::Ellipse(e) => e.rotation = rotation,
            Element::Text(e) => e.rotation = rotation,
            Element::Sticky(e) => e.rotation = rotation,
            Element::Image(e) => e.rotation = rotation,
            Element::Table(e) => e.rotation = rotation,
            Element::Stroke(_) | Element::Connector(_) => {}
        }
    }

    /// Check if this element kind supports rotation.
    pub fn supports_rotation(&self) -> bool {
        !matches!(self, Element::Stroke(_) | Element::Connector(_))
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Element::Rectangle(e) => e.group_id,
            Element::Ellipse(e) => e.group_id,
            Element::Text(e) => e.group_id,
            Element::Sticky(e) => e.group_id,
            Element::Image(e) => e.group_id,
            Element::Table(e) => e.group_id,
            Element::Stroke(e) => e.group_id,
            Element::Connector(e) => e.group_id,
        }
    }

    pub fn set_group_id(&mut self, group_id: Option<GroupId>) {
        match self {
            Element::Rectangle(e) => e.group_id = group_id,
            Element::Ellipse(e) => e.group_id = group_id,
            Element::Text(e) => e.group_id = group_id,
            Element::Sticky(e) => e.group_id = group_id,
            Element::Image(e) => e.group_id = group_id,
            Element::Table(e) => e.group_id = group_id,
            Element::Stroke(e) => e.group_id = group_id,
            Element::Connector(e) => e.group_id = group_id,
        }
    }

    /// The container this element belongs to, if any.
    pub fn section_id(&self) -> Option<ElementId> {
        match self {
            Element::Rectangle(e) => e.section_id,
            Element::Ellipse(e) => e.section_id,
            Element::Text(e) => e.section_id,
            Element::Sticky(e) => e.section_id,
            Element::Image(e) => e.section_id,
            Element::Table(e) => e.section_id,
            Element::Stroke(e) => e.section_id,
            Element::Connector(e) => e.section_id,
        }
    }

    pub fn set_section_id(&mut self, section_id: Option<ElementId>) {
        match self {
            Element::Rectangle(e) => e.section_id = section_id,
            Element::Ellipse(e) => e.section_id = section_id,
            Element::Text(e) => e.section_id = section_id,
            Element::Sticky(e) => e.section_id = section_id,
            Element::Image(e) => e.section_id = section_id,
            Element::Table(e) => e.section_id = section_id,
            Element::Stroke(e) => e.section_id = section_id,
            Element::Connector(e) => e.section_id = section_id,
        }
    }

    pub fn style(&self) -> &ElementStyle {
        match self {
            Element::Rectangle(e) => &e.style,
            Element::Ellipse(e) => &e.style,
            Element::Text(e) => &e.style,
            Element::Sticky(e) => &e.style,
            Element::Image(e) => &e.style,
            Element::Table(e) => &e.style,
            Element::Stroke(e) => &e.style,
            Element::Connector(e) => &e.style,
        }
    }

    pub fn style_mut(&mut self) -> &mut ElementStyle {
        match self {
            Element::Rectangle(e) => &mut e.style,
            Element::Ellipse(e) => &mut e.style,
            Element::Text(e) => &mut e.style,
            Element::Sticky(e) => &mut e.style,
            Element::Image(e) => &mut e.style,
            Element::Table(e) => &mut e.style,
            Element::Stroke(e) => &mut e.style,
            Element::Connector(e) => &mut e.style,
        }
    }

    /// Stable name for logging and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Rectangle(_) => "rectangle",
            Element::Ellipse(_) => "ellipse",
            Element::Text(_) => "text",
            Element::Sticky(_) => "sticky",
            Element::Image(_) => "image",
            Element::Table(_) => "table",
            Element::Stroke(_) => "stroke",
            Element::Connector(_) => "connector",
        }
    }

    /// Check if this element can contain other elements.
    pub fn is_container(&self) -> bool {
        matches!(self, Element::Sticky(s) if s.is_container)
    }

    /// Child elements, for containers. Empty for everything else.
    pub fn child_ids(&self) -> &[ElementId] {
        match self {
            Element::Sticky(s) => &s.child_ids,
            _ => &[],
        }
    }

    /// Check if this element holds text a double-click should edit.
    pub fn is_editable_text(&self) -> bool {
        matches!(
            self,
            Element::Text(_) | Element::Sticky(_) | Element::Table(_)
        )
    }

    /// Regenerate the element's ID. Used when duplicating so copies are
    /// independent entities.
    pub fn regenerate_id(&mut self) {
        let new_id = ElementId::new();
        match self {
            Element::Rectangle(e) => e.id = new_id,
            Element::Ellipse(e) => e.id = new_id,
            Element::Text(e) => e.id = new_id,
            Element::Sticky(e) => e.id = new_id,
            Element::Image(e) => e.id = new_id,
            Element::Table(e) => e.id = new_id,
            Element::Stroke(e) => e.id = new_id,
            Element::Connector(e) => e.id = new_id,
        }
    }

    /// Apply a partial update to the element's common fields.
    ///
    /// Coordinates and extents are sanitized; rotation on a kind without
    /// rotation support is ignored.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if patch.x.is_some() || patch.y.is_some() {
            let origin = self.bounds().origin();
            let x = sanitize_coord(patch.x.unwrap_or(origin.x));
            let y = sanitize_coord(patch.y.unwrap_or(origin.y));
            self.set_position(Point::new(x, y));
        }
        if patch.width.is_some() || patch.height.is_some() {
            let bounds = self.bounds();
            let width = sanitize_extent(patch.width.unwrap_or(bounds.width()));
            let height = sanitize_extent(patch.height.unwrap_or(bounds.height()));
            self.set_size(Size::new(width, height));
        }
        if let Some(rotation) = patch.rotation {
            self.set_rotation(rotation);
        }
        if let Some(group_id) = patch.group_id {
            self.set_group_id(group_id);
        }
        if let Some(section_id) = patch.section_id {
            self.set_section_id(section_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ElementId::new();
        let b = ElementId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_extent() {
        assert_eq!(sanitize_extent(10.0), 10.0);
        assert_eq!(sanitize_extent(-5.0), 0.0);
        assert_eq!(sanitize_extent(f64::NAN), 0.0);
        assert_eq!(sanitize_extent(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        assert!((point_to_segment_dist(Point::new(-4.0, 0.0), a, b) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_patch_moves_and_resizes() {
        let mut el = Element::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0));
        el.apply_patch(&ElementPatch::move_to(20.0, 30.0));
        assert_eq!(el.bounds().origin(), Point::new(20.0, 30.0));

        el.apply_patch(&ElementPatch::resize(200.0, 80.0));
        let bounds = el.bounds();
        assert!((bounds.width() - 200.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 80.0).abs() < f64::EPSILON);
        // Origin stays put across a resize.
        assert_eq!(bounds.origin(), Point::new(20.0, 30.0));
    }

    #[test]
    fn test_apply_patch_clamps_bad_geometry() {
        let mut el = Element::Rectangle(Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0));
        el.apply_patch(&ElementPatch::resize(-10.0, f64::NAN));
        let bounds = el.bounds();
        assert_eq!(bounds.width(), 0.0);
        assert_eq!(bounds.height(), 0.0);
    }

    #[test]
    fn test_rotation_ignored_for_strokes() {
        let mut el = Element::Stroke(Stroke::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
        ]));
        assert!(!el.supports_rotation());
        el.set_rotation(1.0);
        assert_eq!(el.rotation(), 0.0);
    }
}
