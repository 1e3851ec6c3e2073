//! Reference extraction from parsed formulas.
//!
//! The dependency graph tracks range references coarsely, as whole
//! rectangles, never by enumerating member cells. Membership checks go
//! through [`CellRange::contains`], so a formula over A1:Z1000 costs one
//! range entry no matter how many cells it covers.

use gridcalc_core::{CellCoord, CellRange};
use rustc_hash::FxHashSet;

use crate::formula::parser::Expr;

/// The set of cells and ranges a formula reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefSet {
    pub cells: FxHashSet<CellCoord>,
    pub ranges: Vec<CellRange>,
}

impl RefSet {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.ranges.is_empty()
    }

    /// Whether the formula reads `coord`, directly or through a range.
    pub fn contains(&self, coord: CellCoord) -> bool {
        self.cells.contains(&coord) || self.ranges.iter().any(|r| r.contains(coord))
    }
}

/// Walk an expression and collect every reference it contains.
pub fn extract_refs(expr: &Expr) -> RefSet {
    let mut refs = RefSet::default();
    collect(expr, &mut refs);
    refs
}

fn collect(expr: &Expr, refs: &mut RefSet) {
    match expr {
        Expr::CellRef(coord) => {
            refs.cells.insert(*coord);
        }
        Expr::Range(range) => {
            if !refs.ranges.contains(range) {
                refs.ranges.push(*range);
            }
        }
        Expr::Function { args, .. } => {
            for arg in args {
                collect(arg, refs);
            }
        }
        Expr::Binary { left, right, .. } => {
            collect(left, refs);
            collect(right, refs);
        }
        Expr::Unary { operand, .. } => collect(operand, refs),
        Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) | Expr::RefDeleted => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;

    fn coord(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col)
    }

    fn refs_of(formula: &str) -> RefSet {
        extract_refs(&parse(formula).unwrap())
    }

    #[test]
    fn test_direct_refs() {
        let refs = refs_of("=A1+B2*C3");
        assert_eq!(refs.cells.len(), 3);
        assert!(refs.cells.contains(&coord(0, 0)));
        assert!(refs.cells.contains(&coord(1, 1)));
        assert!(refs.cells.contains(&coord(2, 2)));
        assert!(refs.ranges.is_empty());
    }

    #[test]
    fn test_range_kept_whole() {
        let refs = refs_of("=SUM(A1:Z1000)");
        assert!(refs.cells.is_empty());
        assert_eq!(refs.ranges, vec![CellRange::new(coord(0, 0), coord(999, 25))]);
    }

    #[test]
    fn test_duplicate_range_collapsed() {
        let refs = refs_of("=SUM(A1:A5)+AVERAGE(A1:A5)");
        assert_eq!(refs.ranges.len(), 1);
    }

    #[test]
    fn test_contains_via_range() {
        let refs = refs_of("=SUM(B2:D4)");
        assert!(refs.contains(coord(2, 2)));
        assert!(refs.contains(coord(1, 1)));
        assert!(!refs.contains(coord(0, 0)));
        assert!(!refs.contains(coord(4, 2)));
    }

    #[test]
    fn test_no_refs() {
        let refs = refs_of("=1+2*3");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_refs_inside_nested_args() {
        let refs = refs_of("=SUM(A1,SUM(B1:B3),-C1)");
        assert!(refs.cells.contains(&coord(0, 0)));
        assert!(refs.cells.contains(&coord(0, 2)));
        assert_eq!(refs.ranges, vec![CellRange::new(coord(0, 1), coord(2, 1))]);
    }
}
