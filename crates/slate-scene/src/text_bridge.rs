//! Text overlay bridge: world-space geometry for the host's text editor.
//!
//! While an element's text is edited, the host positions a native input
//! overlay on top of the canvas. This bridge owns the editing state
//! machine (idle -> editing -> commit/cancel -> idle) and the coordinate
//! math between world space and the overlay's host pixels.

use kurbo::{Point, Rect, Size};
use log::warn;
use slate_core::{ElementId, Viewport};

/// Padding added around measured text content, world units.
pub const TEXT_PADDING: f64 = 8.0;
/// Guard margin added on commit so re-rendered text never clips by a
/// single pixel.
pub const COMMIT_GUARD: f64 = 2.0;

/// Minimum-size and padding rules for growing a text frame.
#[derive(Debug, Clone, Copy)]
pub struct SizeConstraints {
    pub min_width: f64,
    pub min_height: f64,
    pub padding: f64,
    pub guard: f64,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 20.0,
            min_height: 24.0,
            padding: TEXT_PADDING,
            guard: COMMIT_GUARD,
        }
    }
}

/// The committed result of an edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCommit {
    pub element: ElementId,
    pub text: String,
}

#[derive(Debug)]
enum EditPhase {
    Idle,
    Editing {
        element: ElementId,
        original: String,
        buffer: String,
    },
}

/// Bridges between an element's world rect and the host's text overlay.
#[derive(Debug)]
pub struct TextOverlayBridge {
    phase: EditPhase,
    /// The canvas container's rectangle within the host page.
    host: Rect,
    /// Device pixel ratio of the host display.
    dpr: f64,
}

impl Default for TextOverlayBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl TextOverlayBridge {
    pub fn new() -> Self {
        Self {
            phase: EditPhase::Idle,
            host: Rect::ZERO,
            dpr: 1.0,
        }
    }

    /// Update the host container rectangle. The host re-reads its
    /// bounding box on resize and pushes it here.
    pub fn set_host_rect(&mut self, host: Rect) {
        self.host = host;
    }

    /// Update the device pixel ratio.
    pub fn set_device_pixel_ratio(&mut self, dpr: f64) {
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    }

    /// Convert an element's world rectangle to overlay coordinates (host
    /// page pixels), accounting for pan, zoom and the container position.
    ///
    /// Coordinates are snapped to the device pixel grid so the overlay
    /// never lands on a fractional pixel and blurs.
    pub fn world_rect_to_overlay(&self, rect: Rect, viewport: &Viewport) -> Rect {
        let top_left = viewport.world_to_screen(rect.origin());
        let bottom_right = viewport.world_to_screen(Point::new(rect.x1, rect.y1));
        let snap = |v: f64| (v * self.dpr).round() / self.dpr;
        Rect::new(
            snap(top_left.x + self.host.x0),
            snap(top_left.y + self.host.y0),
            snap(bottom_right.x + self.host.x0),
            snap(bottom_right.y + self.host.y0),
        )
    }

    /// Convert a size measured in overlay pixels back to world units.
    pub fn overlay_size_to_world(&self, size: Size, viewport: &Viewport) -> Size {
        Size::new(size.width / viewport.scale, size.height / viewport.scale)
    }

    /// Apply minimum-size and padding rules to a measured content size.
    ///
    /// Called on every keystroke with a cheap point-text measurement, and
    /// once more on commit (`authoritative`) with the full bounding box,
    /// where the guard margin is added.
    pub fn grow_to_fit(
        &self,
        measured: Size,
        constraints: &SizeConstraints,
        authoritative: bool,
    ) -> Size {
        let guard = if authoritative { constraints.guard } else { 0.0 };
        Size::new(
            (measured.width + constraints.padding * 2.0 + guard).max(constraints.min_width),
            (measured.height + constraints.padding * 2.0 + guard).max(constraints.min_height),
        )
    }

    /// Enter editing for an element. A previous session still open is a
    /// protocol violation; its buffer is discarded.
    pub fn begin_edit(&mut self, element: ElementId, text: &str) {
        if let EditPhase::Editing { element: old, .. } = &self.phase {
            warn!("text edit began while element {old} was editing; discarding its buffer");
        }
        self.phase = EditPhase::Editing {
            element,
            original: text.to_string(),
            buffer: text.to_string(),
        };
    }

    /// Replace the edit buffer (one call per keystroke).
    pub fn set_buffer(&mut self, text: &str) {
        match &mut self.phase {
            EditPhase::Editing { buffer, .. } => {
                buffer.clear();
                buffer.push_str(text);
            }
            EditPhase::Idle => warn!("buffer update with no edit in progress; ignored"),
        }
    }

    pub fn buffer(&self) -> Option<&str> {
        match &self.phase {
            EditPhase::Editing { buffer, .. } => Some(buffer),
            EditPhase::Idle => None,
        }
    }

    /// Whether an edit session is active. The keyboard-shortcut dispatcher
    /// consults this flag and suppresses global shortcuts while it is set.
    pub fn is_editing(&self) -> bool {
        matches!(self.phase, EditPhase::Editing { .. })
    }

    pub fn editing_element(&self) -> Option<ElementId> {
        match &self.phase {
            EditPhase::Editing { element, .. } => Some(*element),
            EditPhase::Idle => None,
        }
    }

    /// Commit the edit and return to idle.
    ///
    /// Returns None when nothing was being edited or the buffer equals
    /// the original text; an unchanged commit must not produce a history
    /// entry, and the caller relies on None to skip the store write.
    pub fn commit(&mut self) -> Option<TextCommit> {
        match std::mem::replace(&mut self.phase, EditPhase::Idle) {
            EditPhase::Editing {
                element,
                original,
                buffer,
            } => {
                if buffer == original {
                    return None;
                }
                Some(TextCommit {
                    element,
                    text: buffer,
                })
            }
            EditPhase::Idle => None,
        }
    }

    /// Discard the buffer and return to idle. Returns the element that
    /// was being edited, if any.
    pub fn cancel(&mut self) -> Option<ElementId> {
        match std::mem::replace(&mut self.phase, EditPhase::Idle) {
            EditPhase::Editing { element, .. } => Some(element),
            EditPhase::Idle => None,
        }
    }
}
