//! Text element.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default font size for new text elements.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// A block of text with a wrap width.
///
/// The frame is resized to fit content by the text overlay bridge on
/// commit; `width`/`height` here are the committed frame, not a live
/// measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub content: String,
    pub font_size: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl TextBox {
    /// Create a new text element at a position.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            position,
            width: 0.0,
            height: DEFAULT_FONT_SIZE * 1.2,
            content: content.into(),
            font_size: DEFAULT_FONT_SIZE,
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
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
