//! Scene sync: reconciles store snapshots against the retained scene graph.
//!
//! SceneSync is the sole owner of graphical nodes. It diffs the latest
//! snapshot against the previously synced one, applies the minimal set of
//! node creations, updates and removals, keeps the spatial index current,
//! and schedules at most one repaint per affected surface per frame.

use crate::node::SceneNode;
use crate::surface::{FrameScheduler, Surface};
use log::trace;
use slate_core::{EdgeId, ElementId, Snapshot, SpatialIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Work performed by one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// The retained scene graph for one canvas.
#[derive(Debug, Default)]
pub struct SceneSync {
    prev: Option<Snapshot>,
    nodes: HashMap<ElementId, SceneNode>,
    edge_nodes: HashMap<EdgeId, SceneNode>,
    order: Vec<ElementId>,
    /// Elements whose main node is hidden (text overlay editing).
    hidden: HashSet<ElementId>,
}

impl SceneSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the scene graph with a snapshot.
    ///
    /// Calling this twice with the same snapshot performs no node work the
    /// second time: the revision check short-circuits, so sync is
    /// idempotent and cheap to call after every store action.
    pub fn sync(
        &mut self,
        snapshot: &Snapshot,
        spatial: &mut SpatialIndex,
        frames: &mut FrameScheduler,
    ) -> SyncStats {
        let mut stats = SyncStats::default();
        if let Some(prev) = &self.prev {
            if prev.revision == snapshot.revision {
                return stats;
            }
        } else {
            // First sync paints the backdrop.
            frames.schedule(Surface::Background);
        }

        let elements_changed = self
            .prev
            .as_ref()
            .is_none_or(|p| !Arc::ptr_eq(&p.elements, &snapshot.elements));
        if elements_changed {
            for (id, element) in snapshot.elements.iter() {
                let previous = self.prev.as_ref().and_then(|p| p.elements.get(id));
                match previous {
                    None => {
                        let mut node = SceneNode::from_element(element);
                        node.visible = !self.hidden.contains(id);
                        spatial.insert(*id, element.bounds());
                        self.nodes.insert(*id, node);
                        stats.created += 1;
                    }
                    Some(old) if old != element => {
                        if let Some(node) = self.nodes.get_mut(id) {
                            node.apply_element(element);
                            node.visible = !self.hidden.contains(id);
                        }
                        spatial.update(*id, element.bounds());
                        stats.updated += 1;
                    }
                    Some(_) => {}
                }
            }
            if let Some(prev) = &self.prev {
                for id in prev.elements.keys() {
                    if !snapshot.elements.contains_key(id) {
                        self.nodes.remove(id);
                        self.hidden.remove(id);
                        spatial.remove(*id);
                        stats.removed += 1;
                    }
                }
            }
        }

        let edges_changed = self
            .prev
            .as_ref()
            .is_none_or(|p| !Arc::ptr_eq(&p.edges, &snapshot.edges));
        if edges_changed {
            for (id, edge) in snapshot.edges.iter() {
                let previous = self.prev.as_ref().and_then(|p| p.edges.get(id));
                match previous {
                    None => {
                        self.edge_nodes.insert(*id, SceneNode::from_edge(edge));
                        stats.created += 1;
                    }
                    Some(old) if old != edge => {
                        if let Some(node) = self.edge_nodes.get_mut(id) {
                            node.apply_edge(edge);
                        }
                        stats.updated += 1;
                    }
                    Some(_) => {}
                }
            }
            if let Some(prev) = &self.prev {
                for id in prev.edges.keys() {
                    if !snapshot.edges.contains_key(id) {
                        self.edge_nodes.remove(id);
                        stats.removed += 1;
                    }
                }
            }
        }

        let order_changed = self
            .prev
            .as_ref()
            .is_none_or(|p| p.element_order != snapshot.element_order);
        if order_changed {
            self.order = snapshot.element_order.as_ref().clone();
        }

        if !stats.is_noop() || order_changed {
            frames.schedule(Surface::Main);
        }
        if self
            .prev
            .as_ref()
            .is_none_or(|p| p.selection != snapshot.selection)
        {
            frames.schedule(Surface::Overlay);
        }
        if self
            .prev
            .as_ref()
            .is_none_or(|p| p.viewport != snapshot.viewport)
        {
            // A new view transform repaints every surface.
            frames.schedule_all();
        }

        trace!(
            "sync r{}: +{} ~{} -{}",
            snapshot.revision, stats.created, stats.updated, stats.removed
        );
        self.prev = Some(snapshot.clone());
        stats
    }

    /// Hide or show an element's main node (text overlay editing dims the
    /// canvas text while the DOM editor is up).
    pub fn set_element_hidden(
        &mut self,
        id: ElementId,
        hidden: bool,
        frames: &mut FrameScheduler,
    ) {
        let changed = if hidden {
            self.hidden.insert(id)
        } else {
            self.hidden.remove(&id)
        };
        if changed {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.visible = !hidden;
            }
            frames.schedule(Surface::Main);
        }
    }

    pub fn node(&self, id: ElementId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn edge_node(&self, id: EdgeId) -> Option<&SceneNode> {
        self.edge_nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() + self.edge_nodes.len()
    }

    /// Nodes of the main surface in paint order: elements back-to-front,
    /// then edges on top.
    pub fn paint_list(&self) -> Vec<&SceneNode> {
        let mut list: Vec<&SceneNode> = self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect();
        list.extend(self.edge_nodes.values());
        list
    }

    /// The indexed bounds of the last synced snapshot's content, for
    /// culling queries from the host.
    pub fn synced_revision(&self) -> Option<u64> {
        self.prev.as_ref().map(|p| p.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect, Vec2};
    use slate_core::element::Rectangle;
    use slate_core::{Element, ElementPatch, ElementStore, UpdateOptions};

    fn fixture() -> (ElementStore, SpatialIndex, FrameScheduler, SceneSync) {
        (
            ElementStore::new(),
            SpatialIndex::new(),
            FrameScheduler::new(),
            SceneSync::new(),
        )
    }

    fn rect_at(x: f64, y: f64) -> Element {
        Element::Rectangle(Rectangle::new(Point::new(x, y), 100.0, 100.0))
    }

    #[test]
    fn test_sync_is_idempotent() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        store.add_element(rect_at(0.0, 0.0));

        let first = scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert_eq!(first.created, 1);
        frames.take_frame();

        let second = scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert!(second.is_noop());
        assert!(!frames.has_pending());
    }

    #[test]
    fn test_minimal_diff_on_update() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        let a = store.add_element(rect_at(0.0, 0.0));
        let _b = store.add_element(rect_at(300.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);

        store.update_element(a, &ElementPatch::move_to(50.0, 50.0), UpdateOptions::default());
        let stats = scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert_eq!(stats, SyncStats { created: 0, updated: 1, removed: 0 });

        // The node and the spatial index both track the move.
        assert_eq!(
            scene.node(a).unwrap().frame,
            Rect::new(50.0, 50.0, 150.0, 150.0)
        );
        assert_eq!(
            spatial.bounds_of(a),
            Some(Rect::new(50.0, 50.0, 150.0, 150.0))
        );
    }

    #[test]
    fn test_removal_destroys_node_and_index_entry() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        let a = store.add_element(rect_at(0.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);

        store.delete_element(a);
        let stats = scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert_eq!(stats.removed, 1);
        assert!(scene.node(a).is_none());
        assert!(!spatial.contains(a));
    }

    #[test]
    fn test_selection_change_schedules_overlay_only() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        let a = store.add_element(rect_at(0.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);
        frames.take_frame();

        store.set_selection([a]);
        let stats = scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert!(stats.is_noop());
        assert!(frames.is_scheduled(Surface::Overlay));
        assert!(!frames.is_scheduled(Surface::Main));
    }

    #[test]
    fn test_viewport_change_schedules_everything() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        store.add_element(rect_at(0.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);
        frames.take_frame();

        store.pan_viewport(Vec2::new(10.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);
        for surface in Surface::ALL {
            assert!(frames.is_scheduled(surface));
        }
    }

    #[test]
    fn test_hidden_survives_update() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        let a = store.add_element(rect_at(0.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);

        scene.set_element_hidden(a, true, &mut frames);
        assert!(!scene.node(a).unwrap().visible);

        // A store update must not resurrect the hidden node.
        store.update_element(a, &ElementPatch::move_to(5.0, 5.0), UpdateOptions::default());
        scene.sync(store.snapshot(), &mut spatial, &mut frames);
        assert!(!scene.node(a).unwrap().visible);

        scene.set_element_hidden(a, false, &mut frames);
        assert!(scene.node(a).unwrap().visible);
    }

    #[test]
    fn test_paint_list_follows_z_order() {
        let (mut store, mut spatial, mut frames, mut scene) = fixture();
        let a = store.add_element(rect_at(0.0, 0.0));
        let b = store.add_element(rect_at(10.0, 0.0));
        scene.sync(store.snapshot(), &mut spatial, &mut frames);

        store.bring_to_front(a);
        scene.sync(store.snapshot(), &mut spatial, &mut frames);

        let order: Vec<ElementId> = scene
            .paint_list()
            .iter()
            .filter_map(|n| n.element)
            .collect();
        assert_eq!(order, vec![b, a]);
    }
}
