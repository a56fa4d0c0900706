//! Element store: the single source of truth for canvas state.
//!
//! Every mutation produces a new [`Snapshot`] whose maps are replaced by
//! reference (copy-on-write behind `Arc`), so consumers detect change via
//! the revision counter or pointer identity, never deep comparison.

use crate::edge::{Edge, EdgeId};
use crate::element::{Element, ElementId, ElementPatch, GroupId};
use crate::selection::Selection;
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of undo states to keep. Older entries are evicted.
pub const MAX_HISTORY: usize = 50;

/// Store errors. Only genuinely fallible surfaces return these; routine
/// faults (stale references, bad geometry) are absorbed per the error
/// design and never surface to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// An immutable view of the full canvas state at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// All elements, keyed by id.
    pub elements: Arc<HashMap<ElementId, Element>>,
    /// Z-order of elements (back to front).
    pub element_order: Arc<Vec<ElementId>>,
    /// All edges, keyed by id.
    pub edges: Arc<HashMap<EdgeId, Edge>>,
    pub selection: Selection,
    pub viewport: Viewport,
    /// Bumped on every mutation; equal revisions mean identical state.
    pub revision: u64,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            elements: Arc::new(HashMap::new()),
            element_order: Arc::new(Vec::new()),
            edges: Arc::new(HashMap::new()),
            selection: Selection::none(),
            viewport: Viewport::default(),
            revision: 0,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Elements in z-order (back to front).
    pub fn elements_ordered(&self) -> impl Iterator<Item = &Element> {
        self.element_order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Position of an element in the z-order (0 = backmost).
    pub fn z_position(&self, id: ElementId) -> Option<usize> {
        self.element_order.iter().position(|&other| other == id)
    }

    /// All members of a group, in z-order.
    pub fn group_members(&self, group: GroupId) -> Vec<ElementId> {
        self.element_order
            .iter()
            .filter(|id| {
                self.elements
                    .get(id)
                    .is_some_and(|el| el.group_id() == Some(group))
            })
            .copied()
            .collect()
    }

    /// Bounding box of all elements, or None when empty.
    pub fn content_bounds(&self) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for element in self.elements.values() {
            let bounds = element.bounds();
            result = Some(match result {
                Some(r) => r.union(bounds),
                None => bounds,
            });
        }
        result
    }
}

/// One undo/redo history state.
///
/// Edges are captured alongside the fields the history contract names so
/// that undoing an element deletion also restores its severed edges.
#[derive(Debug, Clone)]
struct HistoryEntry {
    elements: Arc<HashMap<ElementId, Element>>,
    element_order: Arc<Vec<ElementId>>,
    edges: Arc<HashMap<EdgeId, Edge>>,
    selection: Selection,
}

/// Options for mutating operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Suspend history recording for this mutation. Continuous gestures
    /// set this on every intermediate update; the finalizing call leaves
    /// it unset and commits the gesture's net effect as one entry.
    pub skip_history: bool,
}

impl UpdateOptions {
    /// Options for a high-frequency intermediate update.
    pub fn continuous() -> Self {
        Self { skip_history: true }
    }
}

/// One entry of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub id: ElementId,
    pub patch: ElementPatch,
}

/// Plain serializable form of the canvas, the persistence surface.
///
/// Contains only data: no graphical-node references ever appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub elements: Vec<Element>,
    pub element_order: Vec<ElementId>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
}

/// The canonical store of canvas state.
pub struct ElementStore {
    snapshot: Snapshot,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// State captured at the start of a `skip_history` run, committed by
    /// the finalizing non-skip mutation.
    pending: Option<HistoryEntry>,
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::empty(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
        }
    }

    /// The current snapshot. Cloning it is cheap (shared maps).
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            elements: Arc::clone(&self.snapshot.elements),
            element_order: Arc::clone(&self.snapshot.element_order),
            edges: Arc::clone(&self.snapshot.edges),
            selection: self.snapshot.selection.clone(),
        }
    }

    /// Record history for a mutation about to happen.
    fn record(&mut self, opts: UpdateOptions) {
        if opts.skip_history {
            if self.pending.is_none() {
                self.pending = Some(self.history_entry());
            }
            return;
        }
        let entry = self.pending.take().unwrap_or_else(|| self.history_entry());
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    fn touch(&mut self) {
        self.snapshot.revision += 1;
    }

    fn elements_mut(&mut self) -> &mut HashMap<ElementId, Element> {
        Arc::make_mut(&mut self.snapshot.elements)
    }

    fn order_mut(&mut self) -> &mut Vec<ElementId> {
        Arc::make_mut(&mut self.snapshot.element_order)
    }

    fn edges_mut(&mut self) -> &mut HashMap<EdgeId, Edge> {
        Arc::make_mut(&mut self.snapshot.edges)
    }

    /// Add an element on top of the z-order. Returns its id.
    ///
    /// A `section_id` naming a missing or non-container element is
    /// stripped; a valid one is mirrored into the container's child index.
    pub fn add_element(&mut self, mut element: Element) -> ElementId {
        let id = element.id();
        if let Some(section) = element.section_id() {
            if !self.snapshot.elements.get(&section).is_some_and(Element::is_container) {
                warn!("element {id} references missing container {section}; detaching");
                element.set_section_id(None);
            }
        }
        self.record(UpdateOptions::default());

        if let Some(section) = element.section_id() {
            if let Some(Element::Sticky(note)) = self.elements_mut().get_mut(&section) {
                note.attach_child(id);
            }
        }
        self.order_mut().push(id);
        self.elements_mut().insert(id, element);
        self.touch();
        id
    }

    /// Apply a partial update to an element.
    ///
    /// Returns false when the element is gone (stale reference, a silent
    /// no-op) or when nothing changed and no gesture needed finalizing.
    pub fn update_element(
        &mut self,
        id: ElementId,
        patch: &ElementPatch,
        opts: UpdateOptions,
    ) -> bool {
        self.update_element_with(id, |el| el.apply_patch(patch), opts)
    }

    /// Apply an arbitrary kind-specific mutation to an element.
    pub fn update_element_with(
        &mut self,
        id: ElementId,
        mutate: impl FnOnce(&mut Element),
        opts: UpdateOptions,
    ) -> bool {
        let Some(current) = self.snapshot.elements.get(&id) else {
            warn!("update on missing element {id}; ignored");
            return false;
        };
        let mut updated = current.clone();
        mutate(&mut updated);

        if updated == *current {
            if opts.skip_history || self.pending.is_none() {
                return false;
            }
            // Unchanged final call: commit the gesture's pending entry.
            self.record(opts);
            return true;
        }

        self.record(opts);
        self.elements_mut().insert(id, updated);
        self.touch();
        true
    }

    /// Apply several patches as one atomic action with one history entry.
    ///
    /// Stale ids inside the batch are skipped (logged); the remaining
    /// patches still apply.
    pub fn batch_update(&mut self, updates: &[ElementUpdate], opts: UpdateOptions) -> usize {
        let mut changed: Vec<(ElementId, Element)> = Vec::new();
        for update in updates {
            let Some(current) = self.snapshot.elements.get(&update.id) else {
                warn!("batch update on missing element {}; skipped", update.id);
                continue;
            };
            let mut updated = current.clone();
            updated.apply_patch(&update.patch);
            if updated != *current {
                changed.push((update.id, updated));
            }
        }
        if changed.is_empty() {
            if !opts.skip_history && self.pending.is_some() {
                self.record(opts);
            }
            return 0;
        }

        self.record(opts);
        let count = changed.len();
        let elements = self.elements_mut();
        for (id, element) in changed {
            elements.insert(id, element);
        }
        self.touch();
        count
    }

    /// Delete an element.
    ///
    /// Atomically, in the same action: every edge referencing the element
    /// is deleted, children of a container are detached (positions kept),
    /// the element leaves its parent's child index and the selection.
    pub fn delete_element(&mut self, id: ElementId) -> bool {
        let Some(element) = self.snapshot.elements.get(&id) else {
            warn!("delete of missing element {id}; ignored");
            return false;
        };
        let parent = element.section_id();
        let children: Vec<ElementId> = element.child_ids().to_vec();
        let severed: Vec<EdgeId> = self
            .snapshot
            .edges
            .values()
            .filter(|edge| edge.references(id))
            .map(|edge| edge.id)
            .collect();

        self.record(UpdateOptions::default());

        let elements = self.elements_mut();
        elements.remove(&id);
        for child in children {
            if let Some(child_el) = elements.get_mut(&child) {
                child_el.set_section_id(None);
            }
        }
        if let Some(parent) = parent {
            if let Some(Element::Sticky(note)) = elements.get_mut(&parent) {
                note.detach_child(id);
            }
        }
        self.order_mut().retain(|&other| other != id);
        let edges = self.edges_mut();
        for edge_id in &severed {
            edges.remove(edge_id);
        }
        self.snapshot.selection.remove(id);
        for edge_id in severed {
            self.snapshot.selection.remove_edge(edge_id);
        }
        self.touch();
        true
    }

    /// Delete everything in the current selection as one atomic action
    /// with one history entry. Applies the same severing rules as
    /// [`Self::delete_element`].
    pub fn delete_selection(&mut self) -> usize {
        let ids: Vec<ElementId> = self
            .snapshot
            .selection
            .elements
            .iter()
            .copied()
            .filter(|id| self.snapshot.elements.contains_key(id))
            .collect();
        let selected_edge = self
            .snapshot
            .selection
            .edge
            .filter(|id| self.snapshot.edges.contains_key(id));
        if ids.is_empty() && selected_edge.is_none() {
            return 0;
        }

        let severed: Vec<EdgeId> = self
            .snapshot
            .edges
            .values()
            .filter(|edge| ids.iter().any(|&id| edge.references(id)))
            .map(|edge| edge.id)
            .chain(selected_edge)
            .collect();
        let parents: Vec<(ElementId, ElementId)> = ids
            .iter()
            .filter_map(|&id| {
                let parent = self.snapshot.elements.get(&id)?.section_id()?;
                Some((parent, id))
            })
            .collect();
        let orphans: Vec<ElementId> = ids
            .iter()
            .flat_map(|&id| {
                self.snapshot
                    .elements
                    .get(&id)
                    .map(|el| el.child_ids().to_vec())
                    .unwrap_or_default()
            })
            .collect();

        self.record(UpdateOptions::default());

        let count = ids.len();
        let elements = self.elements_mut();
        for id in &ids {
            elements.remove(id);
        }
        for child in orphans {
            if let Some(child_el) = elements.get_mut(&child) {
                child_el.set_section_id(None);
            }
        }
        for (parent, child) in parents {
            if let Some(Element::Sticky(note)) = elements.get_mut(&parent) {
                note.detach_child(child);
            }
        }
        self.order_mut().retain(|id| !ids.contains(id));
        let edges = self.edges_mut();
        for edge_id in &severed {
            edges.remove(edge_id);
        }
        self.snapshot.selection = Selection::none();
        self.touch();
        count
    }

    /// Discard an in-flight continuous gesture, restoring the state
    /// captured at its first `skip_history` mutation. No history entry is
    /// recorded. No-op when no gesture is in flight.
    pub fn abort_continuous(&mut self) -> bool {
        let Some(entry) = self.pending.take() else {
            return false;
        };
        self.restore(entry);
        true
    }

    /// Add an edge. Routed points are derived from current element
    /// positions when the edge arrives without a cache.
    pub fn add_edge(&mut self, mut edge: Edge) -> Option<EdgeId> {
        if self.snapshot.elements.get(&edge.source.element).is_none() {
            warn!("edge source references missing element; ignored");
            return None;
        }
        if let Some(target) = edge.target.element() {
            if self.snapshot.elements.get(&target).is_none() {
                warn!("edge target references missing element; ignored");
                return None;
            }
        }
        if edge.points.len() < 2 {
            if let Some(points) = edge.derive_points(&self.snapshot.elements) {
                edge.points = points;
            }
        }
        let id = edge.id;
        self.record(UpdateOptions::default());
        self.edges_mut().insert(id, edge);
        self.touch();
        Some(id)
    }

    /// Delete an edge.
    pub fn delete_edge(&mut self, id: EdgeId) -> bool {
        if !self.snapshot.edges.contains_key(&id) {
            warn!("delete of missing edge {id}; ignored");
            return false;
        }
        self.record(UpdateOptions::default());
        self.edges_mut().remove(&id);
        self.snapshot.selection.remove_edge(id);
        self.touch();
        true
    }

    /// Rewrite an edge's cached routed points.
    ///
    /// A cache write: it never enters history and never clears redo.
    pub fn set_edge_points(&mut self, id: EdgeId, points: Vec<Point>) -> bool {
        let Some(edge) = self.snapshot.edges.get(&id) else {
            warn!("reflow of missing edge {id}; ignored");
            return false;
        };
        if edge.points == points {
            return false;
        }
        if let Some(edge) = self.edges_mut().get_mut(&id) {
            edge.points = points;
        }
        self.touch();
        true
    }

    /// Replace the element selection. Not a history action.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let selection = Selection::of(ids.into_iter().filter(|id| {
            self.snapshot.elements.contains_key(id)
        }));
        if self.snapshot.selection != selection {
            self.snapshot.selection = selection;
            self.touch();
        }
    }

    /// Select a single edge (clearing any element selection).
    pub fn select_edge(&mut self, id: EdgeId) {
        if !self.snapshot.edges.contains_key(&id) {
            warn!("selection of missing edge {id}; ignored");
            return;
        }
        let selection = Selection::edge(id);
        if self.snapshot.selection != selection {
            self.snapshot.selection = selection;
            self.touch();
        }
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        let ids: Vec<ElementId> = self.snapshot.element_order.as_ref().clone();
        self.set_selection(ids);
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        if !self.snapshot.selection.is_empty() {
            self.snapshot.selection = Selection::none();
            self.touch();
        }
    }

    /// Replace the viewport. Not a history action; scale is clamped.
    pub fn set_viewport(&mut self, mut viewport: Viewport) {
        viewport.set_scale(viewport.scale);
        if self.snapshot.viewport != viewport {
            self.snapshot.viewport = viewport;
            self.touch();
        }
    }

    /// Pan the viewport by a screen-space delta.
    pub fn pan_viewport(&mut self, delta: Vec2) {
        self.snapshot.viewport.pan(delta);
        self.touch();
    }

    /// Zoom the viewport, keeping a screen point fixed.
    pub fn zoom_viewport_at(&mut self, screen: Point, factor: f64) {
        self.snapshot.viewport.zoom_at(screen, factor);
        self.touch();
    }

    /// Fit the viewport to the current content.
    pub fn fit_view(&mut self, padding: f64) {
        if let Some(bounds) = self.snapshot.content_bounds() {
            self.snapshot.viewport.fit_to_bounds(bounds, padding);
            self.touch();
        }
    }

    /// Bring an element to the front of the z-order.
    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.reorder(id, |order, pos| {
            if pos + 1 == order.len() {
                return false;
            }
            let id = order.remove(pos);
            order.push(id);
            true
        })
    }

    /// Send an element to the back of the z-order.
    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.reorder(id, |order, pos| {
            if pos == 0 {
                return false;
            }
            let id = order.remove(pos);
            order.insert(0, id);
            true
        })
    }

    /// Move an element one layer forward.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.reorder(id, |order, pos| {
            if pos + 1 >= order.len() {
                return false;
            }
            order.swap(pos, pos + 1);
            true
        })
    }

    /// Move an element one layer backward.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.reorder(id, |order, pos| {
            if pos == 0 {
                return false;
            }
            order.swap(pos, pos - 1);
            true
        })
    }

    fn reorder(
        &mut self,
        id: ElementId,
        apply: impl FnOnce(&mut Vec<ElementId>, usize) -> bool,
    ) -> bool {
        let Some(pos) = self.snapshot.z_position(id) else {
            warn!("reorder of missing element {id}; ignored");
            return false;
        };
        // Probe on a scratch copy so a no-op never records history.
        let mut order = self.snapshot.element_order.as_ref().clone();
        if !apply(&mut order, pos) {
            return false;
        }
        self.record(UpdateOptions::default());
        *self.order_mut() = order;
        self.touch();
        true
    }

    /// Assign a fresh shared group id to the selected elements.
    /// Returns None when fewer than two elements are selected.
    pub fn group_selection(&mut self) -> Option<GroupId> {
        let ids: Vec<ElementId> = self.snapshot.selection.elements.iter().copied().collect();
        if ids.len() < 2 {
            return None;
        }
        let group = GroupId::new();
        self.record(UpdateOptions::default());
        let elements = self.elements_mut();
        for id in ids {
            if let Some(element) = elements.get_mut(&id) {
                element.set_group_id(Some(group));
            }
        }
        self.touch();
        Some(group)
    }

    /// Clear the group id of every selected element.
    pub fn ungroup_selection(&mut self) -> usize {
        let ids: Vec<ElementId> = self
            .snapshot
            .selection
            .elements
            .iter()
            .copied()
            .filter(|id| {
                self.snapshot
                    .elements
                    .get(id)
                    .is_some_and(|el| el.group_id().is_some())
            })
            .collect();
        if ids.is_empty() {
            return 0;
        }
        self.record(UpdateOptions::default());
        let elements = self.elements_mut();
        for &id in &ids {
            if let Some(element) = elements.get_mut(&id) {
                element.set_group_id(None);
            }
        }
        self.touch();
        ids.len()
    }

    /// Duplicate the selected elements, offset by `offset`, and select
    /// the copies. Copies are independent: fresh ids, no group, no
    /// container membership.
    pub fn duplicate_selected(&mut self, offset: Vec2) -> Vec<ElementId> {
        let mut copies: Vec<Element> = Vec::new();
        for id in &self.snapshot.selection.elements {
            if let Some(element) = self.snapshot.elements.get(id) {
                let mut copy = element.clone();
                copy.regenerate_id();
                copy.translate(offset);
                copy.set_group_id(None);
                copy.set_section_id(None);
                if let Element::Sticky(note) = &mut copy {
                    note.child_ids.clear();
                }
                copies.push(copy);
            }
        }
        if copies.is_empty() {
            return Vec::new();
        }

        self.record(UpdateOptions::default());
        let ids: Vec<ElementId> = copies.iter().map(Element::id).collect();
        for copy in copies {
            let id = copy.id();
            self.order_mut().push(id);
            self.elements_mut().insert(id, copy);
        }
        self.snapshot.selection = Selection::of(ids.iter().copied());
        self.touch();
        ids
    }

    /// Undo the last committed action. No-op on empty history.
    pub fn undo(&mut self) -> bool {
        self.pending = None;
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.history_entry();
        self.redo_stack.push(current);
        self.restore(entry);
        true
    }

    /// Redo the last undone action. No-op on empty redo stack.
    pub fn redo(&mut self) -> bool {
        self.pending = None;
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.history_entry();
        self.undo_stack.push(current);
        self.restore(entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn restore(&mut self, entry: HistoryEntry) {
        self.snapshot.elements = entry.elements;
        self.snapshot.element_order = entry.element_order;
        self.snapshot.edges = entry.edges;
        self.snapshot.selection = entry.selection;
        self.touch();
    }

    /// Export the plain serializable document.
    pub fn document(&self) -> Document {
        Document {
            elements: self
                .snapshot
                .elements_ordered()
                .cloned()
                .collect(),
            element_order: self.snapshot.element_order.as_ref().clone(),
            edges: self.snapshot.edges.values().cloned().collect(),
            viewport: self.snapshot.viewport,
        }
    }

    /// Replace the whole store state from a document.
    ///
    /// References are validated: edges to missing elements are dropped,
    /// section ids to missing containers are stripped, the z-order is
    /// reconciled with the element set, and the viewport scale clamped.
    /// History is cleared.
    pub fn hydrate(&mut self, document: Document) {
        let mut elements: HashMap<ElementId, Element> = HashMap::new();
        for element in document.elements {
            elements.insert(element.id(), element);
        }

        let mut order: Vec<ElementId> = document
            .element_order
            .into_iter()
            .filter(|id| elements.contains_key(id))
            .collect();
        for &id in elements.keys() {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let stray: Vec<(ElementId, ElementId)> = elements
            .values()
            .filter_map(|el| {
                let section = el.section_id()?;
                let valid = elements.get(&section).is_some_and(Element::is_container);
                (!valid).then_some((el.id(), section))
            })
            .collect();
        for (id, section) in stray {
            warn!("element {id} references missing container {section}; detaching");
            if let Some(element) = elements.get_mut(&id) {
                element.set_section_id(None);
            }
        }

        let mut edges: HashMap<EdgeId, Edge> = HashMap::new();
        for edge in document.edges {
            let source_ok = elements.contains_key(&edge.source.element);
            let target_ok = edge
                .target
                .element()
                .map_or(true, |id| elements.contains_key(&id));
            if source_ok && target_ok {
                edges.insert(edge.id, edge);
            } else {
                warn!("edge {} references missing elements; dropped", edge.id);
            }
        }

        let mut viewport = document.viewport;
        viewport.set_scale(viewport.scale);

        self.snapshot.elements = Arc::new(elements);
        self.snapshot.element_order = Arc::new(order);
        self.snapshot.edges = Arc::new(edges);
        self.snapshot.selection = Selection::none();
        self.snapshot.viewport = viewport;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
        self.touch();
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.document())?)
    }

    /// Load a document from JSON.
    pub fn from_json(&mut self, json: &str) -> Result<(), StoreError> {
        let document: Document = serde_json::from_str(json)?;
        self.hydrate(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Anchor, AnchorRef, EdgeEnd};
    use crate::element::{Rectangle, StickyNote};

    fn rect_at(x: f64, y: f64) -> Element {
        Element::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 100.0))
    }

    #[test]
    fn test_add_and_snapshot_identity() {
        let mut store = ElementStore::new();
        let before = store.snapshot().clone();
        let id = store.add_element(rect_at(0.0, 0.0));

        let after = store.snapshot();
        assert!(after.revision > before.revision);
        assert!(!Arc::ptr_eq(&before.elements, &after.elements));
        assert!(after.element(id).is_some());
        assert!(before.element(id).is_none());
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut store = ElementStore::new();
        let revision = store.snapshot().revision;
        let changed = store.update_element(
            ElementId::new(),
            &ElementPatch::move_to(10.0, 10.0),
            UpdateOptions::default(),
        );
        assert!(!changed);
        assert_eq!(store.snapshot().revision, revision);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_unchanged_update_records_nothing() {
        let mut store = ElementStore::new();
        let id = store.add_element(rect_at(5.0, 5.0));
        let depth = store.undo_stack.len();
        let changed =
            store.update_element(id, &ElementPatch::move_to(5.0, 5.0), UpdateOptions::default());
        assert!(!changed);
        assert_eq!(store.undo_stack.len(), depth);
    }

    #[test]
    fn test_drag_produces_single_history_entry() {
        let mut store = ElementStore::new();
        let id = store.add_element(rect_at(0.0, 0.0));
        let depth = store.undo_stack.len();

        // Continuous moves, then one finalizing commit.
        for step in 1..=10 {
            store.update_element(
                id,
                &ElementPatch::move_to(step as f64 * 5.0, 0.0),
                UpdateOptions::continuous(),
            );
        }
        store.update_element(id, &ElementPatch::move_to(50.0, 0.0), UpdateOptions::default());

        assert_eq!(store.undo_stack.len(), depth + 1);

        // Undo restores the pre-gesture position, not an intermediate one.
        assert!(store.undo());
        let bounds = store.snapshot().element(id).unwrap().bounds();
        assert_eq!(bounds.origin(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_history_round_trip() {
        let mut store = ElementStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(store.add_element(rect_at(i as f64 * 10.0, 0.0)));
        }
        store.update_element(ids[0], &ElementPatch::move_to(500.0, 0.0), UpdateOptions::default());
        store.delete_element(ids[1]);

        let final_elements = store.snapshot().elements.clone();
        let final_order = store.snapshot().element_order.clone();

        let n = store.undo_stack.len();
        for _ in 0..n {
            assert!(store.undo());
        }
        assert!(store.snapshot().elements.is_empty());
        for _ in 0..n {
            assert!(store.redo());
        }

        assert_eq!(*store.snapshot().elements, *final_elements);
        assert_eq!(*store.snapshot().element_order, *final_order);
    }

    #[test]
    fn test_history_bounded() {
        let mut store = ElementStore::new();
        let id = store.add_element(rect_at(0.0, 0.0));
        for i in 0..(MAX_HISTORY + 25) {
            store.update_element(
                id,
                &ElementPatch::move_to(i as f64, 0.0),
                UpdateOptions::default(),
            );
        }
        assert_eq!(store.undo_stack.len(), MAX_HISTORY);

        // Draining history completely is a no-op afterwards.
        while store.undo() {}
        assert!(!store.undo());
    }

    #[test]
    fn test_undo_empty_is_noop() {
        let mut store = ElementStore::new();
        assert!(!store.undo());
        assert!(!store.redo());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut store = ElementStore::new();
        store.add_element(rect_at(0.0, 0.0));
        assert!(store.undo());
        assert!(store.can_redo());
        store.add_element(rect_at(50.0, 50.0));
        assert!(!store.can_redo());
    }

    #[test]
    fn test_delete_severs_edges() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(300.0, 0.0));
        let edge_id = store
            .add_edge(Edge::new(
                AnchorRef::new(a, Anchor::Right),
                EdgeEnd::Anchored(AnchorRef::new(b, Anchor::Left)),
            ))
            .unwrap();

        store.delete_element(a);
        assert!(store.snapshot().edge(edge_id).is_none());

        // Undo restores both the element and the edge.
        assert!(store.undo());
        assert!(store.snapshot().element(a).is_some());
        assert!(store.snapshot().edge(edge_id).is_some());
    }

    #[test]
    fn test_delete_container_detaches_children() {
        let mut store = ElementStore::new();
        let container = store.add_element(Element::Sticky(StickyNote::container(
            Point::new(0.0, 0.0),
            400.0,
            400.0,
        )));
        let mut child = Rectangle::new(Point::new(50.0, 50.0), 80.0, 80.0);
        child.section_id = Some(container);
        let child_id = store.add_element(Element::Rectangle(child));

        assert_eq!(store.snapshot().element(container).unwrap().child_ids(), &[child_id]);

        store.delete_element(container);
        let child_el = store.snapshot().element(child_id).unwrap();
        assert!(child_el.section_id().is_none());
        assert_eq!(child_el.bounds().origin(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_add_element_strips_bad_section() {
        let mut store = ElementStore::new();
        let mut orphan = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
        orphan.section_id = Some(ElementId::new());
        let id = store.add_element(Element::Rectangle(orphan));
        assert!(store.snapshot().element(id).unwrap().section_id().is_none());
    }

    #[test]
    fn test_edge_points_derived_on_add() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(200.0, 200.0));
        let edge_id = store
            .add_edge(Edge::new(
                AnchorRef::new(a, Anchor::Right),
                EdgeEnd::Anchored(AnchorRef::new(b, Anchor::Left)),
            ))
            .unwrap();

        let edge = store.snapshot().edge(edge_id).unwrap();
        assert_eq!(edge.points.first().copied(), Some(Point::new(100.0, 50.0)));
        assert_eq!(edge.points.last().copied(), Some(Point::new(200.0, 250.0)));
    }

    #[test]
    fn test_set_edge_points_skips_history() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let edge_id = store
            .add_edge(Edge::new(
                AnchorRef::new(a, Anchor::Right),
                EdgeEnd::Free(Point::new(400.0, 400.0)),
            ))
            .unwrap();
        let depth = store.undo_stack.len();
        store.set_edge_points(edge_id, vec![Point::new(100.0, 50.0), Point::new(10.0, 10.0)]);
        assert_eq!(store.undo_stack.len(), depth);
    }

    #[test]
    fn test_selection_filters_stale_ids() {
        let mut store = ElementStore::new();
        let id = store.add_element(rect_at(0.0, 0.0));
        store.set_selection([id, ElementId::new()]);
        assert_eq!(store.snapshot().selection.elements.len(), 1);
        assert!(store.snapshot().selection.contains(id));
    }

    #[test]
    fn test_group_and_move_members() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(200.0, 0.0));
        store.set_selection([a, b]);
        let group = store.group_selection().unwrap();

        assert_eq!(store.snapshot().group_members(group), vec![a, b]);
        assert_eq!(store.snapshot().element(a).unwrap().group_id(), Some(group));
    }

    #[test]
    fn test_duplicate_selected() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        store.set_selection([a]);
        let copies = store.duplicate_selected(Vec2::new(20.0, 20.0));
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0], a);
        let copy = store.snapshot().element(copies[0]).unwrap();
        assert_eq!(copy.bounds().origin(), Point::new(20.0, 20.0));
        assert!(store.snapshot().selection.contains(copies[0]));
        assert!(!store.snapshot().selection.contains(a));
    }

    #[test]
    fn test_z_order_ops() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(10.0, 0.0));
        let c = store.add_element(rect_at(20.0, 0.0));

        assert!(store.bring_to_front(a));
        assert_eq!(*store.snapshot().element_order, vec![b, c, a]);

        assert!(store.send_to_back(a));
        assert_eq!(*store.snapshot().element_order, vec![a, b, c]);

        assert!(store.bring_forward(a));
        assert_eq!(*store.snapshot().element_order, vec![b, a, c]);

        assert!(store.send_backward(a));
        assert!(!store.send_backward(a));
        assert_eq!(*store.snapshot().element_order, vec![a, b, c]);
    }

    #[test]
    fn test_delete_selection_is_one_action() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(200.0, 0.0));
        let c = store.add_element(rect_at(400.0, 0.0));
        let edge_id = store
            .add_edge(Edge::new(
                AnchorRef::new(a, Anchor::Right),
                EdgeEnd::Anchored(AnchorRef::new(c, Anchor::Left)),
            ))
            .unwrap();
        store.set_selection([a, b]);

        let depth = store.undo_stack.len();
        assert_eq!(store.delete_selection(), 2);
        assert_eq!(store.undo_stack.len(), depth + 1);
        assert!(store.snapshot().element(c).is_some());
        assert!(store.snapshot().edge(edge_id).is_none());
        assert!(store.snapshot().selection.is_empty());

        // One undo brings back both elements and the severed edge.
        assert!(store.undo());
        assert!(store.snapshot().element(a).is_some());
        assert!(store.snapshot().element(b).is_some());
        assert!(store.snapshot().edge(edge_id).is_some());
    }

    #[test]
    fn test_abort_continuous_restores_pre_gesture_state() {
        let mut store = ElementStore::new();
        let id = store.add_element(rect_at(0.0, 0.0));
        let depth = store.undo_stack.len();

        store.update_element(id, &ElementPatch::move_to(30.0, 0.0), UpdateOptions::continuous());
        store.update_element(id, &ElementPatch::move_to(60.0, 0.0), UpdateOptions::continuous());
        assert!(store.abort_continuous());

        let bounds = store.snapshot().element(id).unwrap().bounds();
        assert_eq!(bounds.origin(), Point::new(0.0, 0.0));
        assert_eq!(store.undo_stack.len(), depth);
        assert!(!store.abort_continuous());
    }

    #[test]
    fn test_document_round_trip() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(200.0, 200.0));
        store.add_edge(Edge::new(
            AnchorRef::new(a, Anchor::Right),
            EdgeEnd::Anchored(AnchorRef::new(b, Anchor::Left)),
        ));

        let json = store.to_json().unwrap();
        let mut restored = ElementStore::new();
        restored.from_json(&json).unwrap();

        assert_eq!(*restored.snapshot().elements, *store.snapshot().elements);
        assert_eq!(
            *restored.snapshot().element_order,
            *store.snapshot().element_order
        );
        assert_eq!(restored.snapshot().edges.len(), 1);
        assert!(!restored.can_undo());
    }

    #[test]
    fn test_hydrate_drops_dangling_edges() {
        let mut store = ElementStore::new();
        let a = store.add_element(rect_at(0.0, 0.0));
        let mut document = store.document();
        document.edges.push(Edge::new(
            AnchorRef::new(ElementId::new(), Anchor::Left),
            EdgeEnd::Anchored(AnchorRef::new(a, Anchor::Right)),
        ));
        document.viewport.scale = 99.0;

        let mut fresh = ElementStore::new();
        fresh.hydrate(document);
        assert!(fresh.snapshot().edges.is_empty());
        assert!((fresh.snapshot().viewport.scale - crate::viewport::MAX_SCALE).abs() < f64::EPSILON);
    }
}
