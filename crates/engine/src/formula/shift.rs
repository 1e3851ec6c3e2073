//! Reference rewriting for structural row/column edits.
//!
//! When a row or column is inserted or deleted, every stored formula AST
//! is rewritten so its references keep pointing at the same data. A
//! direct reference into the deleted row/column becomes [`Expr::RefDeleted`];
//! ranges shrink, and a range deleted in its entirety becomes
//! [`Expr::RefDeleted`] too.

use gridcalc_core::{CellCoord, CellRange};

use crate::formula::parser::Expr;

/// A structural edit, with the 0-based row/column index it applies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    InsertRow(usize),
    DeleteRow(usize),
    InsertCol(usize),
    DeleteCol(usize),
}

/// Rewrite all references in an expression for a structural edit.
pub fn shift_expr(expr: &Expr, op: ShiftOp) -> Expr {
    match expr {
        Expr::CellRef(coord) => match shift_coord(*coord, op) {
            Some(moved) => Expr::CellRef(moved),
            None => Expr::RefDeleted,
        },
        Expr::Range(range) => match shift_range(*range, op) {
            Some(moved) => Expr::Range(moved),
            None => Expr::RefDeleted,
        },
        Expr::Function { name, args } => Expr::Function {
            name: name.clone(),
            args: args.iter().map(|a| shift_expr(a, op)).collect(),
        },
        Expr::Binary { op: bin, left, right } => Expr::Binary {
            op: *bin,
            left: Box::new(shift_expr(left, op)),
            right: Box::new(shift_expr(right, op)),
        },
        Expr::Unary { op: un, operand } => Expr::Unary {
            op: *un,
            operand: Box::new(shift_expr(operand, op)),
        },
        other => other.clone(),
    }
}

/// Move a coordinate for a structural edit. `None` means the cell it
/// pointed at was deleted.
pub fn shift_coord(coord: CellCoord, op: ShiftOp) -> Option<CellCoord> {
    match op {
        ShiftOp::InsertRow(at) => {
            if coord.row >= at {
                Some(CellCoord::new(coord.row + 1, coord.col))
            } else {
                Some(coord)
            }
        }
        ShiftOp::DeleteRow(at) => {
            if coord.row == at {
                None
            } else if coord.row > at {
                Some(CellCoord::new(coord.row - 1, coord.col))
            } else {
                Some(coord)
            }
        }
        ShiftOp::InsertCol(at) => {
            if coord.col >= at {
                Some(CellCoord::new(coord.row, coord.col + 1))
            } else {
                Some(coord)
            }
        }
        ShiftOp::DeleteCol(at) => {
            if coord.col == at {
                None
            } else if coord.col > at {
                Some(CellCoord::new(coord.row, coord.col - 1))
            } else {
                Some(coord)
            }
        }
    }
}

/// Move a range for a structural edit. Deleting a row/column inside the
/// range shrinks it; a range whose every row (or column) was deleted
/// collapses to `None`.
fn shift_range(range: CellRange, op: ShiftOp) -> Option<CellRange> {
    match op {
        ShiftOp::InsertRow(_) | ShiftOp::InsertCol(_) => {
            // Insertions never delete anything; both corners move (or not)
            // independently and stay ordered.
            let start = shift_coord(range.start, op)?;
            let end = shift_coord(range.end, op)?;
            Some(CellRange::new(start, end))
        }
        ShiftOp::DeleteRow(at) => {
            // Collapse check before any subtraction
            if range.start.row == at && range.end.row == at {
                return None;
            }
            let start_row = if range.start.row > at { range.start.row - 1 } else { range.start.row };
            let end_row = if range.end.row >= at { range.end.row - 1 } else { range.end.row };
            Some(CellRange::new(
                CellCoord::new(start_row, range.start.col),
                CellCoord::new(end_row, range.end.col),
            ))
        }
        ShiftOp::DeleteCol(at) => {
            if range.start.col == at && range.end.col == at {
                return None;
            }
            let start_col = if range.start.col > at { range.start.col - 1 } else { range.start.col };
            let end_col = if range.end.col >= at { range.end.col - 1 } else { range.end.col };
            Some(CellRange::new(
                CellCoord::new(range.start.row, start_col),
                CellCoord::new(range.end.row, end_col),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::{format_expr, parse};

    fn coord(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col)
    }

    fn rewrite(formula: &str, op: ShiftOp) -> String {
        format_expr(&shift_expr(&parse(formula).unwrap(), op))
    }

    #[test]
    fn test_insert_row_shifts_refs_at_and_below() {
        assert_eq!(rewrite("=A1+A5", ShiftOp::InsertRow(2)), "=A1+A6");
        assert_eq!(rewrite("=A3", ShiftOp::InsertRow(2)), "=A4");
    }

    #[test]
    fn test_delete_row_shifts_refs_below() {
        assert_eq!(rewrite("=A1+A5", ShiftOp::DeleteRow(2)), "=A1+A4");
    }

    #[test]
    fn test_delete_row_breaks_direct_ref() {
        assert_eq!(rewrite("=A3+1", ShiftOp::DeleteRow(2)), "=#REF!+1");
        assert_eq!(shift_coord(coord(2, 0), ShiftOp::DeleteRow(2)), None);
    }

    #[test]
    fn test_insert_col_shifts_refs() {
        assert_eq!(rewrite("=A1+C1", ShiftOp::InsertCol(1)), "=A1+D1");
    }

    #[test]
    fn test_delete_col_breaks_direct_ref() {
        assert_eq!(rewrite("=B1", ShiftOp::DeleteCol(1)), "=#REF!");
        assert_eq!(rewrite("=C1", ShiftOp::DeleteCol(1)), "=B1");
    }

    #[test]
    fn test_range_shrinks_on_inner_row_delete() {
        assert_eq!(rewrite("=SUM(A1:A5)", ShiftOp::DeleteRow(2)), "=SUM(A1:A4)");
    }

    #[test]
    fn test_range_shifts_whole_when_above_delete() {
        assert_eq!(rewrite("=SUM(A3:A5)", ShiftOp::DeleteRow(0)), "=SUM(A2:A4)");
    }

    #[test]
    fn test_range_untouched_when_delete_below() {
        assert_eq!(rewrite("=SUM(A1:A3)", ShiftOp::DeleteRow(5)), "=SUM(A1:A3)");
    }

    #[test]
    fn test_range_grows_on_inner_row_insert() {
        assert_eq!(rewrite("=SUM(A1:A5)", ShiftOp::InsertRow(2)), "=SUM(A1:A6)");
    }

    #[test]
    fn test_insert_at_range_start_shifts_whole_range() {
        assert_eq!(rewrite("=SUM(A2:A5)", ShiftOp::InsertRow(1)), "=SUM(A3:A6)");
    }

    #[test]
    fn test_single_row_range_collapses() {
        assert_eq!(rewrite("=SUM(A3:C3)", ShiftOp::DeleteRow(2)), "=SUM(#REF!)");
    }

    #[test]
    fn test_single_col_range_collapses() {
        assert_eq!(rewrite("=SUM(B1:B9)", ShiftOp::DeleteCol(1)), "=SUM(#REF!)");
    }

    #[test]
    fn test_range_shrinks_on_col_delete() {
        assert_eq!(rewrite("=SUM(A1:C1)", ShiftOp::DeleteCol(1)), "=SUM(A1:B1)");
        assert_eq!(rewrite("=SUM(B1:D1)", ShiftOp::DeleteCol(0)), "=SUM(A1:C1)");
    }

    #[test]
    fn test_delete_row_zero_no_underflow() {
        // Refs in row 0 collapse, everything else moves up
        assert_eq!(rewrite("=A1+A2", ShiftOp::DeleteRow(0)), "=#REF!+A1");
        assert_eq!(rewrite("=SUM(A1:A3)", ShiftOp::DeleteRow(0)), "=SUM(A1:A2)");
    }

    #[test]
    fn test_literals_untouched() {
        assert_eq!(rewrite("=1+\"x\"", ShiftOp::DeleteRow(0)), "=1+\"x\"");
    }

    #[test]
    fn test_nested_expressions_rewritten_throughout() {
        assert_eq!(
            rewrite("=SUM(A2:A4)*(B3-1)", ShiftOp::InsertRow(2)),
            "=SUM(A2:A5)*(B4-1)"
        );
    }
}
