//! Canvas engine: the per-canvas context object.
//!
//! The host application owns exactly one `CanvasEngine` per visible canvas
//! and threads it through; no component reaches for ambient globals. All
//! pointer events enter here (one entry point per surface), all store
//! actions flow out of here, and redraws leave through the frame scheduler
//! once per animation frame.

use crate::input::{ClickTracker, Modifiers, PointerButton};
use crate::node::{NodeTag, SceneNode};
use crate::pool::{NodePool, PoolKind};
use crate::surface::{FrameScheduler, Surface};
use crate::sync::SceneSync;
use crate::text_bridge::{SizeConstraints, TextOverlayBridge};
use crate::transform::{TransformController, TransformHandle, HANDLE_HIT_TOLERANCE};
use kurbo::{Point, Rect, Size, Vec2};
use log::warn;
use slate_core::element::{Connector, Stroke};
use slate_core::{
    AnchorRef, ConnectorEngine, DraftCommit, EdgeId, Element, ElementId, ElementStore,
    SpatialIndex, UpdateOptions,
};
use std::collections::BTreeSet;

/// Pointer hit tolerance in screen pixels.
pub const HIT_TOLERANCE: f64 = 4.0;

/// The one in-flight pointer gesture. A new pointer-down while one is
/// active is a protocol violation; the old gesture is force-cancelled.
#[derive(Debug)]
enum Gesture {
    /// Pan the viewport (middle button).
    Pan { last: Point },
    /// Move/resize/rotate via the transform widget (state lives there).
    Transform,
    /// Connector draft (state lives in the connector engine).
    ConnectorDraft,
    /// Freehand drawing onto the pooled preview node.
    Stroke { points: Vec<Point> },
    /// Rubber-band selection.
    Marquee { start: Point, current: Point },
}

/// One canvas instance: store, scene graph, and interaction state.
pub struct CanvasEngine {
    pub store: ElementStore,
    pub spatial: SpatialIndex,
    pub scene: SceneSync,
    pub pool: NodePool,
    pub connectors: ConnectorEngine,
    pub text: TextOverlayBridge,
    pub transform: TransformController,
    pub frames: FrameScheduler,
    clicks: ClickTracker,
    gesture: Option<Gesture>,
    /// Pooled line node fed by the active stroke gesture.
    stroke_node: Option<SceneNode>,
    /// Pooled rect node for the active marquee.
    marquee_node: Option<SceneNode>,
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasEngine {
    pub fn new() -> Self {
        Self {
            store: ElementStore::new(),
            spatial: SpatialIndex::new(),
            scene: SceneSync::new(),
            pool: NodePool::new(),
            connectors: ConnectorEngine::new(),
            text: TextOverlayBridge::new(),
            transform: TransformController::new(),
            frames: FrameScheduler::new(),
            clicks: ClickTracker::new(),
            gesture: None,
            stroke_node: None,
            marquee_node: None,
        }
    }

    /// Host resize: new viewport size plus the container's page rect for
    /// the text overlay math.
    pub fn set_host_geometry(&mut self, size: Size, host_rect: Rect, dpr: f64) {
        let mut viewport = self.store.snapshot().viewport;
        viewport.size = size;
        self.store.set_viewport(viewport);
        self.text.set_host_rect(host_rect);
        self.text.set_device_pixel_ratio(dpr);
        self.sync();
    }

    fn world(&self, screen: Point) -> Point {
        self.store.snapshot().viewport.screen_to_world(screen)
    }

    fn world_tolerance(&self) -> f64 {
        HIT_TOLERANCE / self.store.snapshot().viewport.scale
    }

    /// Reconcile the scene graph with the current snapshot. Cheap when
    /// nothing changed; called after every mutation in this dispatch
    /// cycle so reads stay consistent.
    fn sync(&mut self) {
        let snapshot = self.store.snapshot().clone();
        self.scene.sync(&snapshot, &mut self.spatial, &mut self.frames);
    }

    /// Topmost element under a world point, honoring per-kind hit rules.
    pub fn hit_test(&self, world: Point) -> Option<ElementId> {
        let snapshot = self.store.snapshot();
        let tolerance = self.world_tolerance();
        let probe = Rect::new(
            world.x - tolerance,
            world.y - tolerance,
            world.x + tolerance,
            world.y + tolerance,
        );
        let mut candidates = self.spatial.query_range(probe);
        candidates.sort_by_key(|&id| std::cmp::Reverse(snapshot.z_position(id).unwrap_or(0)));
        candidates.into_iter().find(|&id| {
            snapshot
                .element(id)
                .is_some_and(|el| el.hit_test(world, tolerance))
        })
    }

    /// Topmost edge under a world point.
    pub fn hit_test_edge(&self, world: Point) -> Option<EdgeId> {
        let snapshot = self.store.snapshot();
        let tolerance = self.world_tolerance();
        snapshot
            .edges
            .values()
            .find(|edge| edge.hit_test(world, tolerance))
            .map(|edge| edge.id)
    }

    // ---- gesture entry points ------------------------------------------

    /// Pointer-down: the single entry point for the interactive surfaces.
    pub fn pointer_down(&mut self, screen: Point, button: PointerButton, modifiers: Modifiers) {
        if self.gesture.is_some() {
            warn!("pointer down during an active gesture; force-cancelling the old one");
            self.cancel_gesture();
        }
        let world = self.world(screen);

        if button == PointerButton::Middle {
            self.gesture = Some(Gesture::Pan { last: screen });
            return;
        }
        if button != PointerButton::Left {
            return;
        }

        // Clicking outside the overlay commits an in-progress edit.
        if self.text.is_editing() {
            self.commit_text_edit(None);
        }

        let is_double = self.clicks.register(screen);

        if let Some(handle) = self
            .transform
            .handle_at(world, self.store.snapshot(), HANDLE_HIT_TOLERANCE / self.store.snapshot().viewport.scale)
        {
            let snapshot = self.store.snapshot().clone();
            if self.transform.begin(handle, world, &snapshot) {
                self.gesture = Some(Gesture::Transform);
                self.frames.schedule(Surface::Overlay);
            }
            return;
        }

        if let Some(id) = self.hit_test(world) {
            if is_double && self.scene.node(id).is_some_and(SceneNode::is_editable_text) {
                self.begin_text_edit(id);
                return;
            }
            self.select_element(id, modifiers.shift);
            // A press on a selected element starts a move of the whole
            // selection.
            if self.store.snapshot().selection.contains(id) {
                let snapshot = self.store.snapshot().clone();
                if self.transform.begin(TransformHandle::Move, world, &snapshot) {
                    self.gesture = Some(Gesture::Transform);
                }
            }
            self.sync();
            return;
        }

        // Edges are not in the spatial index; scan them directly.
        if let Some(edge_id) = self.hit_test_edge(world) {
            self.store.select_edge(edge_id);
            self.transform.detach();
            self.frames.schedule(Surface::Overlay);
            self.sync();
            return;
        }

        if !modifiers.shift {
            self.store.clear_selection();
            self.transform.detach();
        }
        let mut node = self.pool.acquire(PoolKind::Rect);
        node.tag = NodeTag::Preview;
        node.frame = Rect::from_origin_size(world, Size::ZERO);
        self.marquee_node = Some(node);
        self.gesture = Some(Gesture::Marquee {
            start: world,
            current: world,
        });
        self.frames.schedule(Surface::Preview);
        self.sync();
    }

    /// Begin a freehand stroke (pen tool). Tool layers call this instead
    /// of `pointer_down`.
    pub fn begin_stroke(&mut self, screen: Point) {
        if self.gesture.is_some() {
            warn!("stroke began during an active gesture; force-cancelling the old one");
            self.cancel_gesture();
        }
        let world = self.world(screen);
        let mut node = self.pool.acquire(PoolKind::Line);
        node.tag = NodeTag::Preview;
        node.points.push(world);
        self.stroke_node = Some(node);
        self.gesture = Some(Gesture::Stroke {
            points: vec![world],
        });
        self.frames.schedule(Surface::Preview);
    }

    /// Begin a connector draft from a source anchor (connector tool).
    pub fn begin_connector_draft(&mut self, source: AnchorRef, screen: Point) {
        if self.gesture.is_some() {
            warn!("connector draft began during an active gesture; force-cancelling the old one");
            self.cancel_gesture();
        }
        let world = self.world(screen);
        self.connectors.start_draft(source, world);
        self.gesture = Some(Gesture::ConnectorDraft);
        self.frames.schedule(Surface::Preview);
        self.frames.schedule(Surface::Overlay);
    }

    /// Pointer-move: routed to the active gesture; a move with no gesture
    /// is hover and does nothing here.
    pub fn pointer_move(&mut self, screen: Point) {
        let world = self.world(screen);
        let mut pan_delta: Option<Vec2> = None;
        match self.gesture.as_mut() {
            None => return,
            Some(Gesture::Pan { last }) => {
                pan_delta = Some(screen - *last);
                *last = screen;
            }
            Some(Gesture::Transform) => {
                self.transform.update(world);
                self.frames.schedule(Surface::Preview);
                self.frames.schedule(Surface::Overlay);
            }
            Some(Gesture::ConnectorDraft) => {
                let scale = self.store.snapshot().viewport.scale;
                self.connectors
                    .update_draft(world, self.store.snapshot(), &self.spatial, scale);
                self.frames.schedule(Surface::Preview);
                self.frames.schedule(Surface::Overlay);
            }
            Some(Gesture::Stroke { points }) => {
                points.push(world);
                if let Some(node) = self.stroke_node.as_mut() {
                    node.points.push(world);
                }
                self.frames.schedule(Surface::Preview);
            }
            Some(Gesture::Marquee { start, current }) => {
                *current = world;
                let frame = rect_from_points(*start, world);
                if let Some(node) = self.marquee_node.as_mut() {
                    node.frame = frame;
                }
                self.frames.schedule(Surface::Preview);
            }
        }
        if let Some(delta) = pan_delta {
            self.store.pan_viewport(delta);
            self.sync();
        }
    }

    /// Pointer-up: commits the active gesture. Exactly one committed
    /// write per gesture.
    pub fn pointer_up(&mut self, screen: Point) {
        let world = self.world(screen);
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::Pan { .. } => {}
            Gesture::Transform => {
                self.transform.update(world);
                let updates = self.transform.end();
                if !updates.is_empty() {
                    self.store.batch_update(&updates, UpdateOptions::default());
                    for update in &updates {
                        self.connectors.mark_dirty(update.id);
                    }
                }
                self.frames.schedule(Surface::Preview);
                self.frames.schedule(Surface::Overlay);
            }
            Gesture::ConnectorDraft => {
                let snapshot = self.store.snapshot().clone();
                match self.connectors.commit_draft(&snapshot) {
                    Some(DraftCommit::Edge(edge)) => {
                        self.store.add_edge(edge);
                    }
                    Some(DraftCommit::Free { start, end }) => {
                        self.store
                            .add_element(Element::Connector(Connector::new(start, end)));
                    }
                    None => {}
                }
                self.frames.schedule(Surface::Preview);
                self.frames.schedule(Surface::Overlay);
            }
            Gesture::Stroke { mut points } => {
                if points.last() != Some(&world) {
                    points.push(world);
                }
                if let Some(node) = self.stroke_node.take() {
                    self.pool.release(node);
                }
                if points.len() >= 2 {
                    self.store.add_element(Element::Stroke(Stroke::new(points)));
                }
                self.frames.schedule(Surface::Preview);
            }
            Gesture::Marquee { start, .. } => {
                if let Some(node) = self.marquee_node.take() {
                    self.pool.release(node);
                }
                let rect = rect_from_points(start, world);
                self.select_in_rect(rect);
                self.frames.schedule(Surface::Preview);
            }
        }
        self.sync();
    }

    /// Force-cancel the in-flight gesture, discarding its preview state.
    pub fn cancel_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::Pan { .. } => {}
            Gesture::Transform => self.transform.cancel(),
            Gesture::ConnectorDraft => {
                self.connectors.cancel_draft();
            }
            Gesture::Stroke { .. } => {
                if let Some(node) = self.stroke_node.take() {
                    self.pool.release(node);
                }
            }
            Gesture::Marquee { .. } => {
                if let Some(node) = self.marquee_node.take() {
                    self.pool.release(node);
                }
            }
        }
        // Continuous store writes (text growth) roll back with the
        // gesture.
        self.store.abort_continuous();
        self.frames.schedule(Surface::Preview);
        self.frames.schedule(Surface::Overlay);
        self.sync();
    }

    pub fn has_active_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    // ---- selection ------------------------------------------------------

    fn select_element(&mut self, id: ElementId, additive: bool) {
        let snapshot = self.store.snapshot();
        let mut ids: BTreeSet<ElementId> = if additive {
            let mut current = snapshot.selection.elements.clone();
            if !current.remove(&id) {
                current.insert(id);
            }
            current
        } else if snapshot.selection.contains(id) {
            // Clicking an already-selected element keeps the set (so a
            // drag moves the whole selection).
            snapshot.selection.elements.clone()
        } else {
            BTreeSet::from([id])
        };
        ids = self.expand_groups(ids);
        self.store.set_selection(ids);
        self.attach_transform();
    }

    fn select_in_rect(&mut self, rect: Rect) {
        let snapshot = self.store.snapshot();
        let ids: BTreeSet<ElementId> = self
            .spatial
            .query_range(rect)
            .into_iter()
            .filter(|id| {
                snapshot
                    .element(*id)
                    .is_some_and(|el| rect.intersect(el.bounds()).area() > 0.0)
            })
            .collect();
        let ids = self.expand_groups(ids);
        self.store.set_selection(ids);
        self.attach_transform();
    }

    /// Selecting any member of a group selects the whole group.
    fn expand_groups(&self, ids: BTreeSet<ElementId>) -> BTreeSet<ElementId> {
        let snapshot = self.store.snapshot();
        let mut result = ids.clone();
        for id in ids {
            if let Some(group) = snapshot.element(id).and_then(|el| el.group_id()) {
                result.extend(snapshot.group_members(group));
            }
        }
        result
    }

    /// Re-attach the shared transform widget to the current selection.
    fn attach_transform(&mut self) {
        let ids: Vec<ElementId> = self
            .store
            .snapshot()
            .selection
            .elements
            .iter()
            .copied()
            .collect();
        if ids.is_empty() {
            self.transform.detach();
        } else {
            self.transform.attach(&ids);
        }
        self.frames.schedule(Surface::Overlay);
    }

    // ---- text editing ---------------------------------------------------

    /// Enter text editing for an element. The element's canvas text is
    /// hidden while the host overlay is up.
    pub fn begin_text_edit(&mut self, id: ElementId) -> bool {
        let Some(element) = self.store.snapshot().element(id) else {
            warn!("text edit on missing element {id}; ignored");
            return false;
        };
        let content = match element {
            Element::Text(text) => text.content.clone(),
            Element::Sticky(note) => note.text.clone(),
            _ => return false,
        };
        if self.text.is_editing() {
            self.commit_text_edit(None);
        }
        self.text.begin_edit(id, &content);
        self.scene.set_element_hidden(id, true, &mut self.frames);
        self.frames.schedule(Surface::Overlay);
        true
    }

    /// The overlay rectangle for the element being edited, in host pixels.
    pub fn editing_overlay_rect(&self) -> Option<Rect> {
        let id = self.text.editing_element()?;
        let bounds = self.store.snapshot().element(id)?.bounds();
        Some(
            self.text
                .world_rect_to_overlay(bounds, &self.store.snapshot().viewport),
        )
    }

    /// One keystroke: update the buffer and grow the element's frame to
    /// the cheap measurement. Continuous (no history entries).
    pub fn update_text_buffer(&mut self, text: &str, measured: Size) {
        let Some(id) = self.text.editing_element() else {
            warn!("text buffer update with no edit in progress; ignored");
            return;
        };
        self.text.set_buffer(text);
        let grown = self
            .text
            .grow_to_fit(measured, &SizeConstraints::default(), false);
        self.store
            .update_element_with(id, |el| el.set_size(grown), UpdateOptions::continuous());
        self.connectors.mark_dirty(id);
        self.sync();
    }

    /// Commit the text edit: apply the buffer and the authoritative
    /// measurement as one history entry. An unchanged edit rolls back the
    /// keystroke growth and records nothing.
    pub fn commit_text_edit(&mut self, measured: Option<Size>) -> bool {
        let Some(id) = self.text.editing_element() else {
            return false;
        };
        match self.text.commit() {
            Some(commit) => {
                let size = measured.map(|m| {
                    self.text
                        .grow_to_fit(m, &SizeConstraints::default(), true)
                });
                self.store.update_element_with(
                    id,
                    |el| {
                        match el {
                            Element::Text(text) => text.content = commit.text.clone(),
                            Element::Sticky(note) => note.text = commit.text.clone(),
                            _ => {}
                        }
                        if let Some(size) = size {
                            el.set_size(size);
                        }
                    },
                    UpdateOptions::default(),
                );
                self.connectors.mark_dirty(id);
            }
            None => {
                // Unchanged: no history entry; revert keystroke growth.
                self.store.abort_continuous();
            }
        }
        self.scene.set_element_hidden(id, false, &mut self.frames);
        self.frames.schedule(Surface::Overlay);
        self.sync();
        true
    }

    /// Cancel the text edit, discarding the buffer and any frame growth.
    pub fn cancel_text_edit(&mut self) {
        let Some(id) = self.text.cancel() else {
            return;
        };
        self.store.abort_continuous();
        self.scene.set_element_hidden(id, false, &mut self.frames);
        self.frames.schedule(Surface::Overlay);
        self.sync();
    }

    // ---- keyboard dispatcher surface ------------------------------------

    /// Delete the current selection. Suppressed while text is editing.
    pub fn delete_selection(&mut self) -> usize {
        if self.text.is_editing() {
            return 0;
        }
        let count = self.store.delete_selection();
        if count > 0 || self.store.snapshot().selection.is_empty() {
            self.attach_transform();
        }
        self.sync();
        count
    }

    /// Undo. Suppressed while text is editing.
    pub fn undo(&mut self) -> bool {
        if self.text.is_editing() {
            return false;
        }
        let done = self.store.undo();
        if done {
            self.attach_transform();
            self.sync();
        }
        done
    }

    /// Redo. Suppressed while text is editing.
    pub fn redo(&mut self) -> bool {
        if self.text.is_editing() {
            return false;
        }
        let done = self.store.redo();
        if done {
            self.attach_transform();
            self.sync();
        }
        done
    }

    // ---- frame ----------------------------------------------------------

    /// Animation-frame callback: reflow dirty edges (once per frame, no
    /// matter how many elements moved), reconcile, and drain the redraw
    /// set. Returns the surfaces to repaint, in z-order.
    pub fn on_frame(&mut self) -> Vec<Surface> {
        // At most one reflow batch per frame, no matter how many
        // elements moved. The edge rewrites surface through sync below.
        self.connectors.reflow_dirty_edges(&mut self.store);
        self.sync();
        self.frames.take_frame()
    }

    /// Transient nodes for the preview surface (stroke and marquee).
    pub fn preview_nodes(&self) -> Vec<&SceneNode> {
        self.stroke_node
            .iter()
            .chain(self.marquee_node.iter())
            .collect()
    }

    /// Preview elements for an in-flight transform drag.
    pub fn transform_preview(&self) -> Vec<(ElementId, Element)> {
        self.transform.preview()
    }
}

fn rect_from_points(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}
