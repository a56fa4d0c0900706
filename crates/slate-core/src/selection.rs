//! Selection state.

use crate::edge::EdgeId;
use crate::element::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The current selection: a set of elements plus at most one edge.
///
/// An empty set and "no selection" are the same state; there is no null
/// variant to disambiguate from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub elements: BTreeSet<ElementId>,
    pub edge: Option<EdgeId>,
}

impl Selection {
    /// The empty selection.
    pub fn none() -> Self {
        Self::default()
    }

    /// Select a single element.
    pub fn single(id: ElementId) -> Self {
        Self {
            elements: BTreeSet::from([id]),
            edge: None,
        }
    }

    /// Select a set of elements.
    pub fn of(ids: impl IntoIterator<Item = ElementId>) -> Self {
        Self {
            elements: ids.into_iter().collect(),
            edge: None,
        }
    }

    /// Select a single edge.
    pub fn edge(id: EdgeId) -> Self {
        Self {
            elements: BTreeSet::new(),
            edge: Some(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.edge.is_none()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains(&id)
    }

    /// Drop a deleted element from the selection.
    pub fn remove(&mut self, id: ElementId) {
        self.elements.remove(&id);
    }

    /// Drop a deleted edge from the selection.
    pub fn remove_edge(&mut self, id: EdgeId) {
        if self.edge == Some(id) {
            self.edge = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_states_are_equal() {
        assert_eq!(Selection::none(), Selection::default());
        assert!(Selection::none().is_empty());
        assert!(Selection::of([]).is_empty());
    }

    #[test]
    fn test_remove_clears_edge() {
        let edge = EdgeId::new();
        let mut sel = Selection::edge(edge);
        assert!(!sel.is_empty());
        sel.remove_edge(edge);
        assert!(sel.is_empty());
    }
}
