//! Connector engine: anchor snapping, draft lifecycle and edge reflow.

use crate::edge::{Anchor, AnchorRef, Edge, EdgeEnd};
use crate::element::{Element, ElementId};
use crate::spatial::SpatialIndex;
use crate::store::{ElementStore, Snapshot};
use crate::viewport::MIN_SCALE;
use kurbo::{Point, Rect};
use log::{debug, warn};
use std::collections::HashSet;

/// Snap radius in screen pixels at scale 1.0.
pub const SNAP_RADIUS: f64 = 20.0;

/// Hysteresis factor: once snapped, the pointer must leave this multiple
/// of the snap radius before the target is released. Prevents flicker
/// when hovering near the snap boundary.
pub const UNSNAP_FACTOR: f64 = 1.4;

/// An in-progress connector draft, from pointer-down on a source anchor
/// until commit or cancel.
#[derive(Debug, Clone)]
pub struct ConnectorDraft {
    pub source: AnchorRef,
    pub pointer: Point,
    /// Current snap target, sticky under hysteresis.
    pub snap: Option<AnchorRef>,
}

/// Outcome of committing a connector draft.
#[derive(Debug, Clone)]
pub enum DraftCommit {
    /// Snapped: a bound edge with routed points.
    Edge(Edge),
    /// No target under the pointer. The caller may create a free-floating
    /// two-point connector element instead.
    Free { start: Point, end: Point },
}

/// Computes snap targets and keeps edge routing current.
#[derive(Debug, Default)]
pub struct ConnectorEngine {
    draft: Option<ConnectorDraft>,
    /// Elements that moved since the last reflow. Resolved to their
    /// referencing edges in one pass per frame, so a frame with many
    /// moves stays O(edges + moves).
    moved: HashSet<ElementId>,
}

impl ConnectorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the nearest element anchor within the snap radius.
    ///
    /// The radius is `SNAP_RADIUS` screen pixels converted to world units
    /// at the given scale. Equidistant candidates resolve deterministically
    /// to the element highest in the z-order (most recent wins). Free
    /// connector elements are not snap targets.
    pub fn find_snap_target(
        &self,
        point: Point,
        exclude: Option<ElementId>,
        snapshot: &Snapshot,
        spatial: &SpatialIndex,
        scale: f64,
    ) -> Option<AnchorRef> {
        let radius = SNAP_RADIUS / scale.max(MIN_SCALE);
        let probe = Rect::new(
            point.x - radius,
            point.y - radius,
            point.x + radius,
            point.y + radius,
        );

        let mut best: Option<(f64, usize, AnchorRef)> = None;
        for id in spatial.query_range(probe) {
            if Some(id) == exclude {
                continue;
            }
            let Some(element) = snapshot.element(id) else {
                continue;
            };
            if matches!(element, Element::Connector(_)) {
                continue;
            }
            let z = snapshot.z_position(id).unwrap_or(0);
            let bounds = element.bounds();
            for anchor in Anchor::ALL {
                let dist = (point - anchor.resolve(bounds)).hypot();
                if dist > radius {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some((best_dist, best_z, _)) => {
                        dist + 1e-9 < *best_dist
                            || ((dist - *best_dist).abs() <= 1e-9 && z > *best_z)
                    }
                };
                if better {
                    best = Some((dist, z, AnchorRef::new(id, anchor)));
                }
            }
        }
        best.map(|(_, _, anchor)| anchor)
    }

    /// Begin a draft from a source anchor.
    pub fn start_draft(&mut self, source: AnchorRef, pointer: Point) {
        if self.draft.is_some() {
            warn!("connector draft started while one was active; discarding the old draft");
        }
        self.draft = Some(ConnectorDraft {
            source,
            pointer,
            snap: None,
        });
    }

    /// Update the draft pointer and re-evaluate the snap target.
    ///
    /// An existing target is kept while the pointer stays within
    /// `UNSNAP_FACTOR` times the snap radius of it (hysteresis); only
    /// after leaving that ring is a new search performed.
    pub fn update_draft(
        &mut self,
        pointer: Point,
        snapshot: &Snapshot,
        spatial: &SpatialIndex,
        scale: f64,
    ) {
        let Some((source, previous)) = self.draft.as_ref().map(|d| (d.source, d.snap)) else {
            warn!("draft update without an active draft; ignored");
            return;
        };

        let mut snap = None;
        if let Some(current) = previous {
            if let Some(element) = snapshot.element(current.element) {
                let anchor_pos = current.anchor.resolve(element.bounds());
                let keep = SNAP_RADIUS * UNSNAP_FACTOR / scale.max(MIN_SCALE);
                if (pointer - anchor_pos).hypot() <= keep {
                    snap = Some(current);
                }
            }
        }
        if snap.is_none() {
            snap = self.find_snap_target(pointer, Some(source.element), snapshot, spatial, scale);
        }

        if let Some(draft) = self.draft.as_mut() {
            draft.pointer = pointer;
            draft.snap = snap;
        }
    }

    /// Override the snap target explicitly (tool layers that run their
    /// own search set it here).
    pub fn set_draft_snap(&mut self, snap: Option<AnchorRef>) {
        if let Some(draft) = self.draft.as_mut() {
            draft.snap = snap;
        } else {
            warn!("draft snap set without an active draft; ignored");
        }
    }

    /// The active draft, for preview rendering.
    pub fn draft(&self) -> Option<&ConnectorDraft> {
        self.draft.as_ref()
    }

    pub fn is_drafting(&self) -> bool {
        self.draft.is_some()
    }

    /// Commit the draft.
    ///
    /// Returns None when no draft was active or the source element is
    /// gone (a stale draft is worthless either way).
    pub fn commit_draft(&mut self, snapshot: &Snapshot) -> Option<DraftCommit> {
        let draft = self.draft.take()?;
        let Some(source_el) = snapshot.element(draft.source.element) else {
            warn!("draft source element disappeared; draft dropped");
            return None;
        };
        let start = draft.source.anchor.resolve(source_el.bounds());

        if let Some(target) = draft.snap {
            if snapshot.element(target.element).is_some() {
                let mut edge = Edge::new(draft.source, EdgeEnd::Anchored(target));
                if let Some(points) = edge.derive_points(&snapshot.elements) {
                    edge.points = points;
                }
                return Some(DraftCommit::Edge(edge));
            }
            warn!("draft snap target disappeared; committing free connector");
        }
        Some(DraftCommit::Free {
            start,
            end: draft.pointer,
        })
    }

    /// Discard the draft. Returns whether one was active.
    pub fn cancel_draft(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Flag every edge referencing this element as needing reflow.
    pub fn mark_dirty(&mut self, element: ElementId) {
        self.moved.insert(element);
    }

    /// Whether a reflow pass has work to do.
    pub fn has_dirty(&self) -> bool {
        !self.moved.is_empty()
    }

    /// Recompute routed points for every edge touching a moved element
    /// and clear the dirty set. One batch; the engine calls this at most
    /// once per animation frame.
    ///
    /// Returns the number of edges whose points actually changed.
    pub fn reflow_dirty_edges(&mut self, store: &mut ElementStore) -> usize {
        if self.moved.is_empty() {
            return 0;
        }
        let moved = std::mem::take(&mut self.moved);
        let snapshot = store.snapshot().clone();

        let mut reflowed = 0;
        for edge in snapshot.edges.values() {
            let touches = moved.contains(&edge.source.element)
                || edge.target.element().is_some_and(|id| moved.contains(&id));
            if !touches {
                continue;
            }
            if let Some(points) = edge.derive_points(&snapshot.elements) {
                if store.set_edge_points(edge.id, points) {
                    reflowed += 1;
                }
            }
        }
        debug!("reflowed {reflowed} edges for {} moved elements", moved.len());
        reflowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementPatch, Rectangle, StickyNote};
    use crate::store::UpdateOptions;

    fn store_with_spatial(elements: Vec<Element>) -> (ElementStore, SpatialIndex) {
        let mut store = ElementStore::new();
        let mut spatial = SpatialIndex::new();
        for element in elements {
            let bounds = element.bounds();
            let id = store.add_element(element);
            spatial.insert(id, bounds);
        }
        (store, spatial)
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::Rectangle(Rectangle::new(Point::new(x, y), w, h))
    }

    #[test]
    fn test_snap_finds_nearest_anchor() {
        let (store, spatial) = store_with_spatial(vec![rect(0.0, 0.0, 100.0, 100.0)]);
        let snapshot = store.snapshot();
        let id = snapshot.element_order[0];
        let engine = ConnectorEngine::new();

        // Near the right-center anchor (100, 50).
        let target = engine
            .find_snap_target(Point::new(108.0, 53.0), None, snapshot, &spatial, 1.0)
            .unwrap();
        assert_eq!(target, AnchorRef::new(id, Anchor::Right));

        // Far away from everything.
        assert!(engine
            .find_snap_target(Point::new(400.0, 400.0), None, snapshot, &spatial, 1.0)
            .is_none());
    }

    #[test]
    fn test_snap_excludes_source() {
        let (store, spatial) = store_with_spatial(vec![rect(0.0, 0.0, 100.0, 100.0)]);
        let snapshot = store.snapshot();
        let id = snapshot.element_order[0];
        let engine = ConnectorEngine::new();

        assert!(engine
            .find_snap_target(Point::new(100.0, 50.0), Some(id), snapshot, &spatial, 1.0)
            .is_none());
    }

    #[test]
    fn test_snap_radius_scales_with_zoom() {
        let (store, spatial) = store_with_spatial(vec![rect(0.0, 0.0, 100.0, 100.0)]);
        let snapshot = store.snapshot();
        let engine = ConnectorEngine::new();

        // 30 world units away: out of range at scale 1 (20 world units)...
        let probe = Point::new(130.0, 50.0);
        assert!(engine
            .find_snap_target(probe, None, snapshot, &spatial, 1.0)
            .is_none());
        // ...but in range when zoomed out to 0.5 (40 world units).
        assert!(engine
            .find_snap_target(probe, None, snapshot, &spatial, 0.5)
            .is_some());
    }

    #[test]
    fn test_snap_ambiguity_prefers_topmost() {
        // Two identical rectangles: anchors coincide exactly.
        let (store, spatial) = store_with_spatial(vec![
            rect(0.0, 0.0, 100.0, 100.0),
            rect(0.0, 0.0, 100.0, 100.0),
        ]);
        let snapshot = store.snapshot();
        let top = snapshot.element_order[1];
        let engine = ConnectorEngine::new();

        let target = engine
            .find_snap_target(Point::new(100.0, 50.0), None, snapshot, &spatial, 1.0)
            .unwrap();
        assert_eq!(target.element, top);
    }

    #[test]
    fn test_draft_hysteresis() {
        let (store, spatial) = store_with_spatial(vec![
            rect(0.0, 0.0, 100.0, 100.0),
            rect(300.0, 0.0, 100.0, 100.0),
        ]);
        let snapshot = store.snapshot();
        let source = snapshot.element_order[0];
        let target = snapshot.element_order[1];
        let mut engine = ConnectorEngine::new();

        engine.start_draft(AnchorRef::new(source, Anchor::Right), Point::new(100.0, 50.0));

        // Move next to the target's left anchor (300, 50): snaps.
        engine.update_draft(Point::new(295.0, 50.0), snapshot, &spatial, 1.0);
        assert_eq!(
            engine.draft().unwrap().snap,
            Some(AnchorRef::new(target, Anchor::Left))
        );

        // 25 units away: outside the 20-unit snap radius but inside the
        // 28-unit hysteresis ring, so the target is kept.
        engine.update_draft(Point::new(275.0, 50.0), snapshot, &spatial, 1.0);
        assert_eq!(
            engine.draft().unwrap().snap,
            Some(AnchorRef::new(target, Anchor::Left))
        );

        // Outside the hysteresis ring: released.
        engine.update_draft(Point::new(240.0, 50.0), snapshot, &spatial, 1.0);
        assert_eq!(engine.draft().unwrap().snap, None);
    }

    #[test]
    fn test_commit_with_target_creates_edge() {
        let (store, spatial) = store_with_spatial(vec![
            rect(0.0, 0.0, 100.0, 100.0),
            rect(300.0, 0.0, 100.0, 100.0),
        ]);
        let snapshot = store.snapshot();
        let source = snapshot.element_order[0];
        let mut engine = ConnectorEngine::new();

        engine.start_draft(AnchorRef::new(source, Anchor::Right), Point::new(100.0, 50.0));
        engine.update_draft(Point::new(298.0, 50.0), snapshot, &spatial, 1.0);

        match engine.commit_draft(snapshot).unwrap() {
            DraftCommit::Edge(edge) => {
                assert_eq!(edge.points.first().copied(), Some(Point::new(100.0, 50.0)));
                assert_eq!(edge.points.last().copied(), Some(Point::new(300.0, 50.0)));
            }
            DraftCommit::Free { .. } => panic!("expected a bound edge"),
        }
        assert!(!engine.is_drafting());
    }

    #[test]
    fn test_commit_without_target_is_free() {
        let (store, spatial) = store_with_spatial(vec![rect(0.0, 0.0, 100.0, 100.0)]);
        let snapshot = store.snapshot();
        let source = snapshot.element_order[0];
        let mut engine = ConnectorEngine::new();

        engine.start_draft(AnchorRef::new(source, Anchor::Right), Point::new(100.0, 50.0));
        engine.update_draft(Point::new(500.0, 500.0), snapshot, &spatial, 1.0);

        match engine.commit_draft(snapshot).unwrap() {
            DraftCommit::Free { start, end } => {
                assert_eq!(start, Point::new(100.0, 50.0));
                assert_eq!(end, Point::new(500.0, 500.0));
            }
            DraftCommit::Edge(_) => panic!("expected a free connector"),
        }
    }

    #[test]
    fn test_cancel_draft() {
        let (store, _spatial) = store_with_spatial(vec![rect(0.0, 0.0, 100.0, 100.0)]);
        let source = store.snapshot().element_order[0];
        let mut engine = ConnectorEngine::new();

        assert!(!engine.cancel_draft());
        engine.start_draft(AnchorRef::new(source, Anchor::Right), Point::new(100.0, 50.0));
        assert!(engine.cancel_draft());
        assert!(!engine.is_drafting());
    }

    /// The reflow scenario from the engine contract: a rectangle at
    /// (0,0,100,100) connected to a sticky note at (200,200,150,150),
    /// rectangle moved by (50,50).
    #[test]
    fn test_reflow_moves_edge_endpoints() {
        let mut store = ElementStore::new();
        let rect_id = store.add_element(rect(0.0, 0.0, 100.0, 100.0));
        let sticky_id = store.add_element(Element::Sticky(StickyNote::new(Point::new(200.0, 200.0))));

        let edge_id = store
            .add_edge(Edge::new(
                AnchorRef::new(rect_id, Anchor::Right),
                EdgeEnd::Anchored(AnchorRef::new(sticky_id, Anchor::Left)),
            ))
            .unwrap();
        let untouched_id = store
            .add_edge(Edge::new(
                AnchorRef::new(sticky_id, Anchor::Bottom),
                EdgeEnd::Free(Point::new(600.0, 600.0)),
            ))
            .unwrap();
        let untouched_before = store.snapshot().edge(untouched_id).unwrap().points.clone();

        store.update_element(rect_id, &ElementPatch::move_to(50.0, 50.0), UpdateOptions::default());

        let mut engine = ConnectorEngine::new();
        engine.mark_dirty(rect_id);
        let reflowed = engine.reflow_dirty_edges(&mut store);
        assert_eq!(reflowed, 1);
        assert!(!engine.has_dirty());

        let edge = store.snapshot().edge(edge_id).unwrap();
        assert_eq!(edge.points.first().copied(), Some(Point::new(150.0, 100.0)));
        assert_eq!(edge.points.last().copied(), Some(Point::new(200.0, 275.0)));

        // Edges not referencing the moved element are untouched.
        let untouched = store.snapshot().edge(untouched_id).unwrap();
        assert_eq!(untouched.points, untouched_before);
    }

    #[test]
    fn test_reflow_without_dirt_is_noop() {
        let mut store = ElementStore::new();
        let mut engine = ConnectorEngine::new();
        assert_eq!(engine.reflow_dirty_edges(&mut store), 0);
    }
}
