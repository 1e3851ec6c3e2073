//! Dependency graph for formula cells.
//!
//! Tracks precedents (what a formula reads) and dependents (which
//! formulas read a given cell) so edits can recompute exactly the
//! affected cells, in order.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (A is a precedent of B)
//! ```
//!
//! # Ranges
//!
//! Range references are stored coarsely as whole rectangles, one entry
//! per (range, formula) pair. "Who depends on A3?" is answered by a
//! containment scan over those entries, never by enumerating range
//! members, so wide ranges cost nothing extra.

use gridcalc_core::{CellCoord, CellRange};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::formula::refs::RefSet;
use crate::recalc::CycleError;

/// Persistent dependency graph for formula cells.
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** every reference in `preds[B]` has a
///    matching reverse entry in `cell_deps` or `range_deps`.
/// 2. **No dangling entries:** empty reverse sets are removed, not stored.
/// 3. **Atomic updates:** `set_formula` removes a cell's old edges and
///    installs the new ones in one call.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// Precedents: for each formula cell, the references it reads.
    preds: FxHashMap<CellCoord, RefSet>,

    /// Reverse edges for direct cell references.
    /// A -> {formula cells that read A directly}
    cell_deps: FxHashMap<CellCoord, FxHashSet<CellCoord>>,

    /// Reverse edges for range references, kept whole.
    range_deps: Vec<(CellRange, CellCoord)>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all edges for a formula cell atomically.
    ///
    /// A formula with no references still registers (it participates in
    /// full recomputes); use [`clear_formula`](Self::clear_formula) when
    /// the cell stops being a formula.
    pub fn set_formula(&mut self, coord: CellCoord, refs: RefSet) {
        self.remove_edges(coord);
        for cell in &refs.cells {
            self.cell_deps.entry(*cell).or_default().insert(coord);
        }
        for range in &refs.ranges {
            self.range_deps.push((*range, coord));
        }
        self.preds.insert(coord, refs);
    }

    /// Remove a cell from the graph entirely (formula deleted or
    /// replaced by a literal).
    pub fn clear_formula(&mut self, coord: CellCoord) {
        self.remove_edges(coord);
    }

    fn remove_edges(&mut self, coord: CellCoord) {
        if let Some(old) = self.preds.remove(&coord) {
            for cell in &old.cells {
                if let Some(deps) = self.cell_deps.get_mut(cell) {
                    deps.remove(&coord);
                    if deps.is_empty() {
                        self.cell_deps.remove(cell);
                    }
                }
            }
            self.range_deps.retain(|(_, dependent)| *dependent != coord);
        }
    }

    /// Whether this cell holds a tracked formula.
    pub fn is_formula_cell(&self, coord: CellCoord) -> bool {
        self.preds.contains_key(&coord)
    }

    /// The references a formula cell reads.
    pub fn refs(&self, coord: CellCoord) -> Option<&RefSet> {
        self.preds.get(&coord)
    }

    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Formula cells that read `coord`, directly or through a containing
    /// range. Sorted and deduplicated.
    pub fn dependents(&self, coord: CellCoord) -> Vec<CellCoord> {
        let mut out: Vec<CellCoord> = self
            .cell_deps
            .get(&coord)
            .into_iter()
            .flat_map(|s| s.iter().copied())
            .collect();
        for (range, dependent) in &self.range_deps {
            if range.contains(coord) {
                out.push(*dependent);
            }
        }
        out.sort();
        out.dedup();
        out
    }

    /// All cells transitively downstream of `coord`, in topological
    /// order (precedents before dependents), `coord` itself excluded.
    ///
    /// Kahn's algorithm over the reachable subgraph, with sorted
    /// tie-breaking so independent dependents come out in coordinate
    /// order. The graph is kept acyclic by edit-time rejection.
    pub fn dependents_of(&self, coord: CellCoord) -> Vec<CellCoord> {
        // Reachable set first (root included, for edge counting).
        let mut reachable = FxHashSet::default();
        reachable.insert(coord);
        let mut stack = vec![coord];
        while let Some(current) = stack.pop() {
            for dep in self.dependents(current) {
                if reachable.insert(dep) {
                    stack.push(dep);
                }
            }
        }

        // In-degrees counting only edges inside the subgraph. Every
        // node except the root has at least one, so the root seeds the
        // queue alone.
        let mut in_degree: FxHashMap<CellCoord, usize> =
            reachable.iter().map(|&c| (c, 0)).collect();
        for &cell in &reachable {
            for dep in self.dependents(cell) {
                if reachable.contains(&dep) {
                    *in_degree.get_mut(&dep).unwrap() += 1;
                }
            }
        }

        let mut queue = vec![coord];
        let mut result = Vec::with_capacity(reachable.len());
        while let Some(cell) = queue.pop() {
            result.push(cell);

            let mut new_zero: Vec<CellCoord> = Vec::new();
            for dep in self.dependents(cell) {
                if let Some(deg) = in_degree.get_mut(&dep) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        new_zero.push(dep);
                    }
                }
            }
            new_zero.sort();
            for cell in new_zero.into_iter().rev() {
                queue.push(cell);
            }
        }

        result.remove(0);
        result
    }

    /// Check whether giving `coord` the references `refs` would create a
    /// cycle. Does not modify the graph.
    ///
    /// A cycle exists exactly when some referenced cell is reachable
    /// from `coord` by following dependent edges (or is `coord` itself,
    /// including `coord` sitting inside one of its own ranges).
    pub fn would_create_cycle(&self, coord: CellCoord, refs: &RefSet) -> Option<CycleError> {
        if refs.contains(coord) {
            return Some(CycleError::self_reference(coord));
        }

        // DFS from coord over dependents, remembering how we got to each
        // cell so the rejection message can show the path.
        let mut prev: FxHashMap<CellCoord, CellCoord> = FxHashMap::default();
        let mut visited = FxHashSet::default();
        let mut stack = vec![coord];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for dep in self.dependents(current) {
                if !prev.contains_key(&dep) {
                    prev.insert(dep, current);
                }
                if refs.contains(dep) {
                    // coord → ... → dep → coord
                    let mut path = vec![dep];
                    let mut cursor = dep;
                    while cursor != coord {
                        cursor = prev[&cursor];
                        path.push(cursor);
                    }
                    path.reverse();
                    return Some(CycleError::cycle(path));
                }
                stack.push(dep);
            }
        }

        None
    }

    /// Topological order of every tracked formula cell.
    ///
    /// Kahn's algorithm with sorted tie-breaking so the order is
    /// deterministic across runs. `Err` means the graph holds a cycle
    /// (possible after a bulk load; interactive edits reject them).
    pub fn topo_order_all(&self) -> Result<Vec<CellCoord>, CycleError> {
        let formula_cells: FxHashSet<CellCoord> = self.preds.keys().copied().collect();
        if formula_cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree: FxHashMap<CellCoord, usize> =
            formula_cells.iter().map(|&c| (c, 0)).collect();
        for &cell in &formula_cells {
            for dep in self.dependents(cell) {
                if formula_cells.contains(&dep) {
                    *in_degree.get_mut(&dep).unwrap() += 1;
                }
            }
        }

        // Descending sort so the smallest coordinate pops first.
        let mut queue: Vec<CellCoord> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&cell, _)| cell)
            .collect();
        queue.sort_by(|a, b| b.cmp(a));

        let mut result = Vec::with_capacity(formula_cells.len());
        while let Some(cell) = queue.pop() {
            result.push(cell);

            let mut new_zero: Vec<CellCoord> = Vec::new();
            for dep in self.dependents(cell) {
                if let Some(deg) = in_degree.get_mut(&dep) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        new_zero.push(dep);
                    }
                }
            }
            new_zero.sort();
            for cell in new_zero.into_iter().rev() {
                queue.push(cell);
            }
        }

        if result.len() < formula_cells.len() {
            let mut cycle_cells: Vec<CellCoord> = formula_cells
                .iter()
                .filter(|c| !result.contains(c))
                .copied()
                .collect();
            cycle_cells.sort();
            return Err(CycleError::cycle(cycle_cells));
        }

        Ok(result)
    }

    /// Check all invariants. Panics if any are violated.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (formula_cell, refs) in &self.preds {
            for cell in &refs.cells {
                assert!(
                    self.cell_deps.get(cell).map_or(false, |s| s.contains(formula_cell)),
                    "missing reverse edge: {} should list {} as dependent",
                    cell,
                    formula_cell
                );
            }
            for range in &refs.ranges {
                assert!(
                    self.range_deps.iter().any(|(r, d)| r == range && d == formula_cell),
                    "missing reverse range edge for {} on {}",
                    formula_cell,
                    range
                );
            }
        }

        for (cell, deps) in &self.cell_deps {
            assert!(!deps.is_empty(), "empty dependent set stored for {}", cell);
            for dep in deps {
                assert!(
                    self.preds.get(dep).map_or(false, |r| r.cells.contains(cell)),
                    "dangling reverse edge: {} lists {} but {1} does not read it",
                    cell,
                    dep
                );
            }
        }

        for (range, dep) in &self.range_deps {
            assert!(
                self.preds.get(dep).map_or(false, |r| r.ranges.contains(range)),
                "dangling range edge: {} for {}",
                range,
                dep
            );
        }
    }
}
