//! Node pool: per-kind freelists of reusable graphical primitives.
//!
//! Exists for the high-frequency drawing-stroke path, where a node is
//! acquired and released once per gesture and its point list mutates on
//! every pointer move. Low-frequency element kinds allocate normally.

use crate::node::{NodeKind, SceneNode};

/// The primitive kinds worth pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Line,
    Rect,
}

impl PoolKind {
    fn node_kind(self) -> NodeKind {
        match self {
            PoolKind::Line => NodeKind::Line,
            PoolKind::Rect => NodeKind::Rect,
        }
    }
}

/// Freelists of reusable nodes, grown on demand and never pre-warmed.
#[derive(Debug, Default)]
pub struct NodePool {
    lines: Vec<SceneNode>,
    rects: Vec<SceneNode>,
    /// Total nodes ever constructed, for diagnostics.
    created: usize,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a node of the given kind, reusing a released one when
    /// available. The returned node has all visual attributes reset.
    pub fn acquire(&mut self, kind: PoolKind) -> SceneNode {
        let freelist = match kind {
            PoolKind::Line => &mut self.lines,
            PoolKind::Rect => &mut self.rects,
        };
        match freelist.pop() {
            Some(node) => node,
            None => {
                self.created += 1;
                SceneNode::new(kind.node_kind())
            }
        }
    }

    /// Return a node to its freelist. Nodes of non-pooled kinds are
    /// simply dropped.
    pub fn release(&mut self, mut node: SceneNode) {
        node.reset();
        match node.kind {
            NodeKind::Line => self.lines.push(node),
            NodeKind::Rect => self.rects.push(node),
            _ => {}
        }
    }

    /// Number of idle nodes of a kind.
    pub fn idle(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Line => self.lines.len(),
            PoolKind::Rect => self.rects.len(),
        }
    }

    /// Total nodes ever constructed by this pool.
    pub fn total_created(&self) -> usize {
        self.created
    }
}
