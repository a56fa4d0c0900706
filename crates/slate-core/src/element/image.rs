//! Image element.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// An image placed on the canvas.
///
/// Pixel data lives with the persistence collaborator; the element only
/// carries a source reference and the natural pixel size for aspect math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Opaque source reference resolved by the host (asset id or URL).
    pub source: String,
    /// Natural pixel width of the source.
    pub natural_width: u32,
    /// Natural pixel height of the source.
    pub natural_height: u32,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl ImageBox {
    /// Create a new image at its natural size.
    pub fn new(position: Point, source: impl Into<String>, natural_width: u32, natural_height: u32) -> Self {
        Self {
            id: ElementId::new(),
            position,
            width: f64::from(natural_width),
            height: f64::from(natural_height),
            source: source.into(),
            natural_width,
            natural_height,
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    /// Natural aspect ratio (width / height), 1.0 for degenerate sources.
    pub fn aspect_ratio(&self) -> f64 {
        if self.natural_height == 0 {
            1.0
        } else {
            f64::from(self.natural_width) / f64::from(self.natural_height)
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, Size::new(self.width, self.height))
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = sanitize_extent(size.width);
        self.height = sanitize_extent(size.height);
    }
}
