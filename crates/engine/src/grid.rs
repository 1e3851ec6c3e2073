//! The grid: cell storage plus the recalculation scheduler.
//!
//! All mutation goes through [`Grid::on_cell_edited`] and the structural
//! row/column operations. Both keep the dependency graph in sync with
//! stored formulas and recompute affected cells in topological order, so
//! every cell's cached value is consistent with current inputs after
//! each call returns.

use std::time::Instant;

use gridcalc_core::CellCoord;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dep_graph::DepGraph;
use crate::error::ErrorKind;
use crate::formula::eval::{evaluate, ValueSource};
use crate::formula::parser::{format_expr, parse, Expr};
use crate::formula::refs::{extract_refs, RefSet};
use crate::formula::shift::{shift_coord, shift_expr, ShiftOp};
use crate::recalc::{EditOutcome, RecalcReport};
use crate::value::CellValue;

/// What the user typed into a cell, after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Number(f64),
    Text(String),
    Boolean(bool),
    Formula {
        /// The formula text as entered (or regenerated after a
        /// structural rewrite), leading `=` included.
        source: String,
        /// Parsed form; `None` when the source failed to parse. Rebuilt
        /// from `source` on load, never serialized.
        #[serde(skip)]
        ast: Option<Expr>,
    },
}

/// One occupied cell: its content and cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,
    pub value: CellValue,
}

/// A bounded grid of cells with formula recalculation.
///
/// Storage is sparse: only occupied cells exist in the map. Reads of
/// unoccupied in-bounds cells are `Empty`; reads outside the bounds are
/// reference errors.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: FxHashMap<CellCoord, Cell>,
    deps: DepGraph,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: FxHashMap::default(),
            deps: DepGraph::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// Current value of a cell. Empty for unoccupied in-bounds cells,
    /// a reference error outside the grid.
    pub fn value(&self, coord: CellCoord) -> CellValue {
        if !self.in_bounds(coord) {
            return CellValue::Error(ErrorKind::Ref);
        }
        self.cells
            .get(&coord)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Stored content of a cell, if occupied.
    pub fn content(&self, coord: CellCoord) -> Option<&CellContent> {
        self.cells.get(&coord).map(|c| &c.content)
    }

    /// The text to show when editing a cell: formula source for
    /// formulas, the rendered value otherwise.
    pub fn input_text(&self, coord: CellCoord) -> String {
        match self.cells.get(&coord) {
            Some(cell) => match &cell.content {
                CellContent::Formula { source, .. } => source.clone(),
                CellContent::Number(n) => CellValue::Number(*n).to_text(),
                CellContent::Text(s) => s.clone(),
                CellContent::Boolean(b) => CellValue::Boolean(*b).to_text(),
            },
            None => String::new(),
        }
    }

    pub fn dep_graph(&self) -> &DepGraph {
        &self.deps
    }

    /// Apply a user edit to one cell.
    ///
    /// Classifies the input (empty, formula, number, boolean, text),
    /// updates the dependency graph, and recomputes the edited cell and
    /// everything downstream of it in topological order. `changed`
    /// lists cells whose value actually differs from before.
    ///
    /// Edits that would create a circular reference are rejected whole:
    /// content, value, and graph are left untouched and the outcome
    /// carries [`ErrorKind::Circular`].
    pub fn on_cell_edited(&mut self, coord: CellCoord, input: &str) -> EditOutcome {
        if !self.in_bounds(coord) {
            return EditOutcome { changed: Vec::new(), error: Some(ErrorKind::Ref) };
        }

        let trimmed = input.trim();
        let old_value = self.value(coord);

        if trimmed.is_empty() {
            self.deps.clear_formula(coord);
            self.cells.remove(&coord);
            let mut changed = Vec::new();
            if !old_value.is_empty() {
                changed.push(coord);
            }
            self.refresh_dependents(coord, &mut changed);
            return EditOutcome { changed, error: None };
        }

        if trimmed.starts_with('=') {
            return self.edit_formula(coord, trimmed, old_value);
        }

        // Literal value. The cell stops being a formula if it was one.
        self.deps.clear_formula(coord);
        let content = if let Ok(n) = trimmed.parse::<f64>() {
            CellContent::Number(n)
        } else if trimmed == "TRUE" {
            CellContent::Boolean(true)
        } else if trimmed == "FALSE" {
            CellContent::Boolean(false)
        } else {
            CellContent::Text(input.to_string())
        };
        self.cells.insert(coord, Cell { content, value: old_value });

        let mut changed = Vec::new();
        if self.refresh(coord) {
            changed.push(coord);
        }
        self.refresh_dependents(coord, &mut changed);
        EditOutcome { changed, error: None }
    }

    fn edit_formula(&mut self, coord: CellCoord, source: &str, old_value: CellValue) -> EditOutcome {
        let ast = match parse(source) {
            Ok(ast) => ast,
            Err(_) => {
                // Unparseable formulas are stored so the user can fix
                // them in place. The edit still commits, so the cell's
                // old edges must go; nothing downstream is recomputed.
                self.deps.set_formula(coord, RefSet::default());
                self.cells.insert(
                    coord,
                    Cell {
                        content: CellContent::Formula { source: source.to_string(), ast: None },
                        value: CellValue::Error(ErrorKind::Syntax),
                    },
                );
                let mut changed = Vec::new();
                if old_value != CellValue::Error(ErrorKind::Syntax) {
                    changed.push(coord);
                }
                return EditOutcome { changed, error: Some(ErrorKind::Syntax) };
            }
        };

        let refs = extract_refs(&ast);
        if self.deps.would_create_cycle(coord, &refs).is_some() {
            return EditOutcome { changed: Vec::new(), error: Some(ErrorKind::Circular) };
        }

        self.deps.set_formula(coord, refs);
        self.cells.insert(
            coord,
            Cell {
                content: CellContent::Formula { source: source.to_string(), ast: Some(ast) },
                value: old_value,
            },
        );

        let mut changed = Vec::new();
        if self.refresh(coord) {
            changed.push(coord);
        }
        self.refresh_dependents(coord, &mut changed);
        EditOutcome { changed, error: None }
    }

    /// Recompute one cell from its content; true if the cached value
    /// changed.
    fn refresh(&mut self, coord: CellCoord) -> bool {
        let new_value = self.computed_value(coord);
        let Some(cell) = self.cells.get_mut(&coord) else {
            return false;
        };
        if cell.value == new_value {
            false
        } else {
            cell.value = new_value;
            true
        }
    }

    /// Recompute everything downstream of `coord` in topological order.
    fn refresh_dependents(&mut self, coord: CellCoord, changed: &mut Vec<CellCoord>) {
        for dep in self.deps.dependents_of(coord) {
            if self.refresh(dep) {
                changed.push(dep);
            }
        }
    }

    fn computed_value(&self, coord: CellCoord) -> CellValue {
        match self.cells.get(&coord).map(|c| &c.content) {
            Some(CellContent::Formula { ast: Some(ast), .. }) => evaluate(ast, self),
            Some(CellContent::Formula { ast: None, .. }) => CellValue::Error(ErrorKind::Syntax),
            Some(CellContent::Number(n)) => CellValue::Number(*n),
            Some(CellContent::Text(s)) => CellValue::Text(s.clone()),
            Some(CellContent::Boolean(b)) => CellValue::Boolean(*b),
            None => CellValue::Empty,
        }
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Insert an empty row before row `at`, shifting rows at and below
    /// down by one.
    pub fn insert_row(&mut self, at: usize) -> RecalcReport {
        self.rows += 1;
        self.apply_shift(ShiftOp::InsertRow(at))
    }

    /// Delete row `at`. References into the deleted row become
    /// reference errors; ranges shrink.
    pub fn delete_row(&mut self, at: usize) -> RecalcReport {
        if at < self.rows {
            self.rows -= 1;
        }
        self.apply_shift(ShiftOp::DeleteRow(at))
    }

    /// Insert an empty column before column `at`.
    pub fn insert_col(&mut self, at: usize) -> RecalcReport {
        self.cols += 1;
        self.apply_shift(ShiftOp::InsertCol(at))
    }

    /// Delete column `at`.
    pub fn delete_col(&mut self, at: usize) -> RecalcReport {
        if at < self.cols {
            self.cols -= 1;
        }
        self.apply_shift(ShiftOp::DeleteCol(at))
    }

    /// Shift cell positions, rewrite every formula's references,
    /// regenerate formula source text, then rebuild the graph and do a
    /// full ordered recompute.
    fn apply_shift(&mut self, op: ShiftOp) -> RecalcReport {
        let start = Instant::now();

        let old_cells = std::mem::take(&mut self.cells);
        for (coord, mut cell) in old_cells {
            let Some(new_coord) = shift_coord(coord, op) else {
                continue;
            };
            if let CellContent::Formula { source, ast: Some(expr) } = &mut cell.content {
                let rewritten = shift_expr(expr, op);
                *source = format_expr(&rewritten);
                *expr = rewritten;
            }
            self.cells.insert(new_coord, cell);
        }

        self.rebuild_graph();
        self.recompute_all(start)
    }

    fn rebuild_graph(&mut self) {
        let mut deps = DepGraph::new();
        for (coord, cell) in &self.cells {
            if let CellContent::Formula { ast, .. } = &cell.content {
                let refs = ast.as_ref().map(extract_refs).unwrap_or_else(RefSet::default);
                deps.set_formula(*coord, refs);
            }
        }
        self.deps = deps;
    }

    /// Recompute every formula cell in dependency order.
    fn recompute_all(&mut self, start: Instant) -> RecalcReport {
        match self.deps.topo_order_all() {
            Ok(order) => {
                for &coord in &order {
                    self.refresh(coord);
                }
                let max_depth = self.max_depth(&order);
                RecalcReport {
                    duration_ms: start.elapsed().as_millis() as u64,
                    cells_recomputed: order.len(),
                    max_depth,
                    had_cycles: false,
                }
            }
            Err(cycle) => {
                for coord in &cycle.cells {
                    if let Some(cell) = self.cells.get_mut(coord) {
                        cell.value = CellValue::Error(ErrorKind::Circular);
                    }
                }
                RecalcReport {
                    duration_ms: start.elapsed().as_millis() as u64,
                    cells_recomputed: 0,
                    max_depth: 0,
                    had_cycles: true,
                }
            }
        }
    }

    /// Dependency depth over a valid topological order: a formula
    /// reading only value cells has depth 1, otherwise one more than its
    /// deepest formula precedent.
    fn max_depth(&self, order: &[CellCoord]) -> usize {
        let mut depths: FxHashMap<CellCoord, usize> = FxHashMap::default();
        let mut max = 0;
        for &coord in order {
            let refs = self.deps.refs(coord);
            let mut depth = 1;
            if let Some(refs) = refs {
                for (&other, &d) in &depths {
                    if refs.contains(other) {
                        depth = depth.max(d + 1);
                    }
                }
            }
            max = max.max(depth);
            depths.insert(coord, depth);
        }
        max
    }
}

impl ValueSource for Grid {
    fn value(&self, coord: CellCoord) -> CellValue {
        Grid::value(self, coord)
    }
}
