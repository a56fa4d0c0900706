//! Table element.

use super::{sanitize_extent, ElementId, ElementStyle, GroupId};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default cell dimensions for new tables.
pub const DEFAULT_CELL_WIDTH: f64 = 120.0;
pub const DEFAULT_CELL_HEIGHT: f64 = 40.0;

/// One cell of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
}

/// A grid of text cells.
///
/// Cells are stored row-major; the grid geometry is the outer product of
/// `col_widths` and `row_heights`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub col_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
    /// Row-major cell contents, `rows * cols` entries.
    pub cells: Vec<TableCell>,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub section_id: Option<ElementId>,
    pub style: ElementStyle,
}

impl Table {
    /// Create a new table with uniform default cells.
    pub fn new(position: Point, rows: usize, cols: usize) -> Self {
        Self {
            id: ElementId::new(),
            position,
            col_widths: vec![DEFAULT_CELL_WIDTH; cols],
            row_heights: vec![DEFAULT_CELL_HEIGHT; rows],
            cells: vec![TableCell::default(); rows * cols],
            rotation: 0.0,
            group_id: None,
            section_id: None,
            style: ElementStyle::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.row_heights.len()
    }

    pub fn cols(&self) -> usize {
        self.col_widths.len()
    }

    /// Total width of all columns.
    pub fn width(&self) -> f64 {
        self.col_widths.iter().sum()
    }

    /// Total height of all rows.
    pub fn height(&self) -> f64 {
        self.row_heights.iter().sum()
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, Size::new(self.width(), self.height()))
    }

    /// Get a cell's contents, or None out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.cells.get(row * self.cols() + col)
    }

    /// Get a cell mutably, or None out of range.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let cols = self.cols();
        self.cells.get_mut(row * cols + col)
    }

    /// World-space rectangle of a cell, or None out of range.
    pub fn cell_rect(&self, row: usize, col: usize) -> Option<Rect> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let x = self.position.x + self.col_widths[..col].iter().sum::<f64>();
        let y = self.position.y + self.row_heights[..row].iter().sum::<f64>();
        Some(Rect::from_origin_size(
            Point::new(x, y),
            Size::new(self.col_widths[col], self.row_heights[row]),
        ))
    }

    /// The (row, col) under a world point, or None outside the grid.
    pub fn cell_at(&self, point: Point) -> Option<(usize, usize)> {
        if !self.bounds().contains(point) {
            return None;
        }
        let mut x = self.position.x;
        let col = self.col_widths.iter().position(|&w| {
            x += w;
            point.x < x
        })?;
        let mut y = self.position.y;
        let row = self.row_heights.iter().position(|&h| {
            y += h;
            point.y < y
        })?;
        Some((row, col))
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Resize by scaling every column and row proportionally.
    pub fn set_size(&mut self, size: Size) {
        let old_width = self.width().max(f64::EPSILON);
        let old_height = self.height().max(f64::EPSILON);
        let sx = sanitize_extent(size.width) / old_width;
        let sy = sanitize_extent(size.height) / old_height;
        for w in &mut self.col_widths {
            *w *= sx;
        }
        for h in &mut self.row_heights {
            *h *= sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_geometry() {
        let table = Table::new(Point::new(10.0, 20.0), 2, 3);
        assert_eq!(table.rows(), 2);
        assert_eq!(table.cols(), 3);
        assert!((table.width() - 3.0 * DEFAULT_CELL_WIDTH).abs() < f64::EPSILON);
        assert!((table.height() - 2.0 * DEFAULT_CELL_HEIGHT).abs() < f64::EPSILON);

        let rect = table.cell_rect(1, 2).unwrap();
        assert_eq!(
            rect.origin(),
            Point::new(10.0 + 2.0 * DEFAULT_CELL_WIDTH, 20.0 + DEFAULT_CELL_HEIGHT)
        );
    }

    #[test]
    fn test_cell_at() {
        let table = Table::new(Point::new(0.0, 0.0), 2, 2);
        assert_eq!(table.cell_at(Point::new(10.0, 10.0)), Some((0, 0)));
        assert_eq!(
            table.cell_at(Point::new(DEFAULT_CELL_WIDTH + 10.0, DEFAULT_CELL_HEIGHT + 10.0)),
            Some((1, 1))
        );
        assert_eq!(table.cell_at(Point::new(-5.0, 10.0)), None);
    }

    #[test]
    fn test_cell_out_of_range() {
        let mut table = Table::new(Point::new(0.0, 0.0), 2, 2);
        assert!(table.cell(2, 0).is_none());
        assert!(table.cell_mut(0, 2).is_none());
        assert!(table.cell_rect(5, 5).is_none());
    }

    #[test]
    fn test_proportional_resize() {
        let mut table = Table::new(Point::new(0.0, 0.0), 2, 2);
        table.set_size(Size::new(table.width() * 2.0, table.height() * 0.5));
        assert!((table.col_widths[0] - 2.0 * DEFAULT_CELL_WIDTH).abs() < 1e-9);
        assert!((table.row_heights[0] - 0.5 * DEFAULT_CELL_HEIGHT).abs() < 1e-9);
    }
}
