//! Spatial index for viewport culling and pointer hit-testing.
//!
//! A uniform grid hash over element bounding boxes. Maintenance is strictly
//! incremental: every store mutation updates only the cells the changed
//! bounds touch, never a full rebuild.

use crate::element::ElementId;
use kurbo::{Point, Rect};
use std::collections::{HashMap, HashSet};

/// Grid cell size in world units.
///
/// Large enough that a typical element touches 1-4 cells, small enough
/// that a viewport query does not scan the whole document.
pub const CELL_SIZE: f64 = 256.0;

#[derive(Debug, Clone)]
struct IndexEntry {
    bounds: Rect,
    /// Monotonic update stamp; higher = more recently inserted/updated.
    stamp: u64,
}

/// Rectangle-indexed lookup from bounds to element ids.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: HashMap<(i64, i64), Vec<ElementId>>,
    entries: HashMap<ElementId, IndexEntry>,
    next_stamp: u64,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    /// The indexed bounds of an element, if present.
    pub fn bounds_of(&self, id: ElementId) -> Option<Rect> {
        self.entries.get(&id).map(|e| e.bounds)
    }

    /// Insert an element's bounds. Replaces any existing entry.
    pub fn insert(&mut self, id: ElementId, bounds: Rect) {
        if self.entries.contains_key(&id) {
            self.detach(id);
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        for key in cell_range(bounds) {
            self.cells.entry(key).or_default().push(id);
        }
        self.entries.insert(id, IndexEntry { bounds, stamp });
    }

    /// Update an element's bounds.
    ///
    /// Cells are only touched when the covered range actually changed, so
    /// a small in-cell move is a stamp bump and nothing else.
    pub fn update(&mut self, id: ElementId, bounds: Rect) {
        let Some(entry) = self.entries.get(&id) else {
            self.insert(id, bounds);
            return;
        };
        let same_cells = cell_key(bounds.origin()) == cell_key(entry.bounds.origin())
            && cell_key(corner(bounds)) == cell_key(corner(entry.bounds));
        if !same_cells {
            self.detach(id);
            for key in cell_range(bounds) {
                self.cells.entry(key).or_default().push(id);
            }
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.entries.insert(id, IndexEntry { bounds, stamp });
    }

    /// Remove an element from the index.
    pub fn remove(&mut self, id: ElementId) {
        if self.entries.contains_key(&id) {
            self.detach(id);
            self.entries.remove(&id);
        }
    }

    /// All elements whose bounds intersect the query rectangle.
    pub fn query_range(&self, range: Rect) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for key in cell_range(range) {
            let Some(ids) = self.cells.get(&key) else {
                continue;
            };
            for &id in ids {
                if !seen.insert(id) {
                    continue;
                }
                if let Some(entry) = self.entries.get(&id) {
                    if rects_intersect(entry.bounds, range) {
                        result.push(id);
                    }
                }
            }
        }
        result
    }

    /// All elements whose bounds contain the point, topmost first.
    ///
    /// "Topmost" is the most recently inserted or updated entry, which is
    /// what the user visually sees as on top after any move.
    pub fn query_point(&self, point: Point) -> Vec<ElementId> {
        let Some(ids) = self.cells.get(&cell_key(point)) else {
            return Vec::new();
        };
        let mut hits: Vec<(u64, ElementId)> = ids
            .iter()
            .filter_map(|&id| {
                let entry = self.entries.get(&id)?;
                entry.bounds.contains(point).then_some((entry.stamp, id))
            })
            .collect();
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Remove an element's id from every cell its current bounds cover.
    fn detach(&mut self, id: ElementId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        let bounds = entry.bounds;
        for key in cell_range(bounds) {
            if let Some(ids) = self.cells.get_mut(&key) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
    }
}

/// Closed-interval intersection: touching edges count as a hit, so a
/// query for an element's exact bounds always finds it.
fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn cell_key(point: Point) -> (i64, i64) {
    (
        (point.x / CELL_SIZE).floor() as i64,
        (point.y / CELL_SIZE).floor() as i64,
    )
}

fn corner(rect: Rect) -> Point {
    Point::new(rect.x1, rect.y1)
}

/// Iterate the cell keys a rectangle covers.
fn cell_range(rect: Rect) -> impl Iterator<Item = (i64, i64)> {
    let (x0, y0) = cell_key(rect.origin());
    let (x1, y1) = cell_key(corner(rect));
    (x0..=x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    #[test]
    fn test_insert_and_query() {
        let mut index = SpatialIndex::new();
        let a = ElementId::new();
        let b = ElementId::new();
        index.insert(a, rect(0.0, 0.0, 100.0, 100.0));
        index.insert(b, rect(500.0, 500.0, 50.0, 50.0));

        let hits = index.query_range(rect(-10.0, -10.0, 120.0, 120.0));
        assert_eq!(hits, vec![a]);

        let all = index.query_range(rect(-1000.0, -1000.0, 4000.0, 4000.0));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_update_moves_entry() {
        let mut index = SpatialIndex::new();
        let a = ElementId::new();
        index.insert(a, rect(0.0, 0.0, 50.0, 50.0));
        index.update(a, rect(1000.0, 1000.0, 50.0, 50.0));

        assert!(index.query_range(rect(0.0, 0.0, 100.0, 100.0)).is_empty());
        assert_eq!(index.query_range(rect(990.0, 990.0, 100.0, 100.0)), vec![a]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut index = SpatialIndex::new();
        let a = ElementId::new();
        index.insert(a, rect(0.0, 0.0, 50.0, 50.0));
        index.remove(a);
        assert!(index.is_empty());
        assert!(index.query_point(Point::new(25.0, 25.0)).is_empty());
    }

    #[test]
    fn test_query_point_topmost_first() {
        let mut index = SpatialIndex::new();
        let a = ElementId::new();
        let b = ElementId::new();
        index.insert(a, rect(0.0, 0.0, 100.0, 100.0));
        index.insert(b, rect(0.0, 0.0, 100.0, 100.0));

        // Last inserted wins.
        assert_eq!(index.query_point(Point::new(50.0, 50.0)), vec![b, a]);

        // Updating `a` moves it on top.
        index.update(a, rect(0.0, 0.0, 100.0, 100.0));
        assert_eq!(index.query_point(Point::new(50.0, 50.0)), vec![a, b]);
    }

    #[test]
    fn test_large_element_spans_cells() {
        let mut index = SpatialIndex::new();
        let a = ElementId::new();
        index.insert(a, rect(-500.0, -500.0, 2000.0, 2000.0));
        assert_eq!(index.query_point(Point::new(900.0, 900.0)), vec![a]);
        assert_eq!(index.query_range(rect(0.0, 0.0, 1.0, 1.0)), vec![a]);
        index.remove(a);
        assert!(index.query_point(Point::new(900.0, 900.0)).is_empty());
    }

    /// Spatial index fidelity: after an arbitrary sequence of operations,
    /// a full-extent query returns exactly the live set.
    #[test]
    fn test_fidelity_after_mixed_ops() {
        let mut index = SpatialIndex::new();
        let mut live: Vec<ElementId> = Vec::new();

        // Deterministic pseudo-random walk over insert/update/remove.
        let mut seed = 0x2545_F491u64;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for i in 0..500u64 {
            let op = next() % 3;
            match op {
                0 => {
                    let id = ElementId::new();
                    let x = (next() % 5000) as f64 - 2500.0;
                    let y = (next() % 5000) as f64 - 2500.0;
                    index.insert(id, rect(x, y, 80.0, 60.0));
                    live.push(id);
                }
                1 if !live.is_empty() => {
                    let id = live[(next() as usize) % live.len()];
                    let x = (next() % 5000) as f64 - 2500.0;
                    index.update(id, rect(x, (i as f64) * 3.0, 40.0, 40.0));
                }
                2 if !live.is_empty() => {
                    let pos = (next() as usize) % live.len();
                    let id = live.swap_remove(pos);
                    index.remove(id);
                }
                _ => {}
            }
        }

        let full = rect(-10_000.0, -10_000.0, 20_000.0, 20_000.0);
        let mut found = index.query_range(full);
        found.sort();
        let mut expected = live.clone();
        expected.sort();
        assert_eq!(found, expected);
        assert_eq!(index.len(), live.len());
    }
}
