//! Rectangular cell ranges.

use serde::{Deserialize, Serialize};

use crate::coord::CellCoord;

/// A rectangular block of cells, possibly degenerate (a single cell).
///
/// Always normalized: `start.row <= end.row` and `start.col <= end.col`,
/// regardless of the order the corners were given in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// Build a range from two corners, normalizing per axis.
    pub fn new(a: CellCoord, b: CellCoord) -> Self {
        Self {
            start: CellCoord::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellCoord::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// A range covering exactly one cell.
    pub fn single(coord: CellCoord) -> Self {
        Self { start: coord, end: coord }
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= self.start.row
            && coord.row <= self.end.row
            && coord.col >= self.start.col
            && coord.col <= self.end.col
    }

    /// Number of cells covered.
    pub fn cell_count(&self) -> usize {
        (self.end.row - self.start.row + 1) * (self.end.col - self.start.col + 1)
    }

    /// Iterate all coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let start = self.start;
        let end = self.end;
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellCoord::new(row, col)))
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col)
    }

    #[test]
    fn test_normalization() {
        let range = CellRange::new(coord(4, 2), coord(1, 5));
        assert_eq!(range.start, coord(1, 2));
        assert_eq!(range.end, coord(4, 5));
    }

    #[test]
    fn test_contains() {
        let range = CellRange::new(coord(0, 0), coord(2, 2));
        assert!(range.contains(coord(0, 0)));
        assert!(range.contains(coord(1, 2)));
        assert!(range.contains(coord(2, 2)));
        assert!(!range.contains(coord(3, 0)));
        assert!(!range.contains(coord(0, 3)));
    }

    #[test]
    fn test_degenerate_single_cell() {
        let range = CellRange::single(coord(3, 3));
        assert_eq!(range.cell_count(), 1);
        assert!(range.contains(coord(3, 3)));
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![coord(3, 3)]);
    }

    #[test]
    fn test_row_major_iteration() {
        let range = CellRange::new(coord(0, 0), coord(1, 1));
        let cells: Vec<_> = range.iter().collect();
        assert_eq!(cells, vec![coord(0, 0), coord(0, 1), coord(1, 0), coord(1, 1)]);
    }

    #[test]
    fn test_display() {
        let range = CellRange::new(coord(0, 0), coord(4, 2));
        assert_eq!(format!("{}", range), "A1:C5");
    }
}
