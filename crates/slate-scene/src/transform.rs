//! Selection transform controller: the shared resize/rotate handle widget.
//!
//! One widget instance serves the whole canvas. It attaches to the current
//! selection, turns handle drags into preview transforms (no store writes),
//! and commits the final geometry exactly once on gesture end.

use kurbo::{Point, Rect, Size, Vec2};
use log::warn;
use slate_core::{Element, ElementId, ElementPatch, ElementUpdate, Snapshot};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;
/// Distance from the selection frame to the rotation handle, world units.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Minimum element extent a resize can produce.
const MIN_EXTENT: f64 = 1.0;

/// Corner positions of the selection frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// What a drag on the widget manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformHandle {
    /// Drag the whole selection.
    Move,
    /// Resize from a corner of the selection frame.
    Corner(Corner),
    /// Rotate (single-element selections only).
    Rotate,
}

/// A positioned handle of the widget.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub kind: TransformHandle,
    /// Position in world coordinates.
    pub position: Point,
}

impl Handle {
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let d = point - self.position;
        d.hypot2() <= tolerance * tolerance
    }
}

#[derive(Debug)]
struct TransformDrag {
    handle: TransformHandle,
    start: Point,
    current: Point,
    /// Combined bounds of the originals when the drag began.
    frame: Rect,
    originals: Vec<(ElementId, Element)>,
}

impl TransformDrag {
    fn delta(&self) -> Vec2 {
        self.current - self.start
    }
}

/// The shared transform widget.
#[derive(Debug, Default)]
pub struct TransformController {
    attached: Vec<ElementId>,
    drag: Option<TransformDrag>,
}

impl TransformController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the widget to a node set.
    ///
    /// Always fully detaches from the previous set first, so no handle
    /// reference survives a selection switch.
    pub fn attach(&mut self, ids: &[ElementId]) {
        self.detach();
        self.attached = ids.to_vec();
    }

    /// Detach the widget, cancelling any drag in flight.
    pub fn detach(&mut self) {
        self.drag = None;
        self.attached.clear();
    }

    pub fn attached(&self) -> &[ElementId] {
        &self.attached
    }

    pub fn is_attached(&self) -> bool {
        !self.attached.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Combined bounds of the attached elements.
    pub fn frame(&self, snapshot: &Snapshot) -> Option<Rect> {
        let mut frame: Option<Rect> = None;
        for id in &self.attached {
            if let Some(element) = snapshot.element(*id) {
                let bounds = element.bounds();
                frame = Some(match frame {
                    Some(f) => f.union(bounds),
                    None => bounds,
                });
            }
        }
        frame
    }

    /// The widget's handles at current element positions.
    pub fn handles(&self, snapshot: &Snapshot) -> Vec<Handle> {
        let Some(frame) = self.frame(snapshot) else {
            return Vec::new();
        };
        let mut handles = vec![
            Handle { kind: TransformHandle::Corner(Corner::TopLeft), position: Point::new(frame.x0, frame.y0) },
            Handle { kind: TransformHandle::Corner(Corner::TopRight), position: Point::new(frame.x1, frame.y0) },
            Handle { kind: TransformHandle::Corner(Corner::BottomLeft), position: Point::new(frame.x0, frame.y1) },
            Handle { kind: TransformHandle::Corner(Corner::BottomRight), position: Point::new(frame.x1, frame.y1) },
        ];
        // Rotation only manipulates a single element.
        if self.attached.len() == 1 {
            handles.push(Handle {
                kind: TransformHandle::Rotate,
                position: Point::new(frame.center().x, frame.y0 - ROTATE_HANDLE_OFFSET),
            });
        }
        handles
    }

    /// The handle under a point, if any.
    pub fn handle_at(
        &self,
        point: Point,
        snapshot: &Snapshot,
        tolerance: f64,
    ) -> Option<TransformHandle> {
        self.handles(snapshot)
            .iter()
            .find(|h| h.hit_test(point, tolerance))
            .map(|h| h.kind)
    }

    /// Begin a drag on a handle. Captures original element state for
    /// preview and commit; no store writes happen until [`Self::end`].
    pub fn begin(&mut self, handle: TransformHandle, point: Point, snapshot: &Snapshot) -> bool {
        if self.drag.is_some() {
            warn!("transform drag began while one was active; replacing it");
        }
        let originals: Vec<(ElementId, Element)> = self
            .attached
            .iter()
            .filter_map(|id| snapshot.element(*id).map(|el| (*id, el.clone())))
            .collect();
        let Some(frame) = originals
            .iter()
            .map(|(_, el)| el.bounds())
            .reduce(|a, b| a.union(b))
        else {
            return false;
        };
        self.drag = Some(TransformDrag {
            handle,
            start: point,
            current: point,
            frame,
            originals,
        });
        true
    }

    /// Update the drag pointer.
    pub fn update(&mut self, point: Point) {
        if let Some(drag) = self.drag.as_mut() {
            drag.current = point;
        }
    }

    /// Preview elements at the current drag position. Pure: the store is
    /// untouched.
    pub fn preview(&self) -> Vec<(ElementId, Element)> {
        let Some(drag) = &self.drag else {
            return Vec::new();
        };
        drag.originals
            .iter()
            .map(|(id, original)| {
                let mut element = original.clone();
                element.apply_patch(&transform_patch(drag, original));
                (*id, element)
            })
            .collect()
    }

    /// End the drag and return the patches to commit.
    ///
    /// Called exactly once per gesture; width/height in the patches are
    /// final normalized dimensions, never a lingering scale factor.
    pub fn end(&mut self) -> Vec<ElementUpdate> {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        drag.originals
            .iter()
            .map(|(id, original)| ElementUpdate {
                id: *id,
                patch: transform_patch(&drag, original),
            })
            .collect()
    }

    /// Abandon the drag without committing anything.
    pub fn cancel(&mut self) {
        self.drag = None;
    }
}

/// Compute the patch a drag applies to one original element.
fn transform_patch(drag: &TransformDrag, original: &Element) -> ElementPatch {
    let bounds = original.bounds();
    match drag.handle {
        TransformHandle::Move => {
            let delta = drag.delta();
            ElementPatch::move_to(bounds.x0 + delta.x, bounds.y0 + delta.y)
        }
        TransformHandle::Corner(corner) => {
            let new_frame = resize_frame(drag.frame, corner, drag.delta());
            let sx = new_frame.width() / drag.frame.width().max(f64::EPSILON);
            let sy = new_frame.height() / drag.frame.height().max(f64::EPSILON);
            ElementPatch {
                x: Some(new_frame.x0 + (bounds.x0 - drag.frame.x0) * sx),
                y: Some(new_frame.y0 + (bounds.y0 - drag.frame.y0) * sy),
                width: Some((bounds.width() * sx).max(MIN_EXTENT)),
                height: Some((bounds.height() * sy).max(MIN_EXTENT)),
                ..ElementPatch::default()
            }
        }
        TransformHandle::Rotate => {
            let center = bounds.center();
            let v = drag.current - center;
            // Offset so pointing straight up is zero rotation.
            let angle = v.y.atan2(v.x) + std::f64::consts::FRAC_PI_2;
            ElementPatch {
                rotation: Some(angle),
                ..ElementPatch::default()
            }
        }
    }
}

/// Move one corner of a frame by a delta, normalizing and enforcing the
/// minimum extent.
fn resize_frame(frame: Rect, corner: Corner, delta: Vec2) -> Rect {
    let (x0, y0, x1, y1) = match corner {
        Corner::TopLeft => (frame.x0 + delta.x, frame.y0 + delta.y, frame.x1, frame.y1),
        Corner::TopRight => (frame.x0, frame.y0 + delta.y, frame.x1 + delta.x, frame.y1),
        Corner::BottomLeft => (frame.x0 + delta.x, frame.y0, frame.x1, frame.y1 + delta.y),
        Corner::BottomRight => (frame.x0, frame.y0, frame.x1 + delta.x, frame.y1 + delta.y),
    };
    let (x0, x1) = if x0 < x1 { (x0, x1) } else { (x1, x0) };
    let (y0, y1) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
    let size = Size::new((x1 - x0).max(MIN_EXTENT), (y1 - y0).max(MIN_EXTENT));
    Rect::from_origin_size(Point::new(x0, y0), size)
}
