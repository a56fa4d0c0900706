//! Sticky note element. Optionally acts as a container for other elements.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId, Rgba};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default sticky note side length.
pub const DEFAULT_STICKY_SIZE: f64 = 150.0;

/// A sticky note: a filled frame with text, optionally owning children.
///
/// Ownership of children is an index only (`child_ids`); a child is an
/// independent element that can be reparented or detached at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNote {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub text: String,
    /// When true, elements can be parented into this note.
    #[serde(default)]
    pub is_container: bool,
    /// Ids of elements parented into this note (their `section_id` points back).
    #[serde(default)]
    pub child_ids: Vec<ElementId>,
    /// Whether children are visually clipped to the note's frame.
    #[serde(default)]
    pub clip_children: bool,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl StickyNote {
    /// Create a new sticky note with the default fill.
    pub fn new(position: Point) -> Self {
        Self {
            id: ElementId::new(),
            position,
            width: DEFAULT_STICKY_SIZE,
            height: DEFAULT_STICKY_SIZE,
            text: String::new(),
            is_container: false,
            child_ids: Vec::new(),
            clip_children: false,
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle {
                // Classic sticky yellow.
                fill: Some(Rgba::new(255, 235, 130, 255)),
                ..ElementStyle::default()
            },
        }
    }

    /// Create a container sticky note.
    pub fn container(position: Point, width: f64, height: f64) -> Self {
        let mut note = Self::new(position);
        note.width = sanitize_extent(width);
        note.height = sanitize_extent(height);
        note.is_container = true;
        note
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
        self.width = size.width;
        self.height = size.height;
    }

    /// Record a child in the ownership index. Idempotent.
    pub fn attach_child(&mut self, child: ElementId) {
        if !self.child_ids.contains(&child) {
            self.child_ids.push(child);
        }
    }

    /// Remove a child from the ownership index.
    pub fn detach_child(&mut self, child: ElementId) {
        self.child_ids.retain(|&id| id != child);
    }
}
