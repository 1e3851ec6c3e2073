//! Recalculation reporting and cycle errors.
//!
//! The types here describe what a recompute did (for logging and the
//! status line) and why an edit was rejected (circular references).

use gridcalc_core::CellCoord;
use thiserror::Error;

/// Result of a single cell edit.
///
/// `changed` lists the cells whose stored value actually differs from
/// before the edit, the edited cell included, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    pub changed: Vec<CellCoord>,
    pub error: Option<crate::error::ErrorKind>,
}

/// Report from a full ordered recompute (structural edits, load).
#[derive(Debug, Clone, Default)]
pub struct RecalcReport {
    /// Time taken for the full recompute in milliseconds.
    pub duration_ms: u64,

    /// Number of formula cells that were recomputed.
    pub cells_recomputed: usize,

    /// Maximum dependency depth encountered.
    /// A formula reading only value cells has depth 1; a formula reading
    /// another formula has depth = max(precedent depths) + 1.
    pub max_depth: usize,

    /// True if cycles were detected during recompute.
    pub had_cycles: bool,
}

impl RecalcReport {
    /// Concise one-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} cells in {}ms, depth={}, cycles={}",
            self.cells_recomputed, self.duration_ms, self.max_depth, self.had_cycles
        )
    }

    /// One-line log entry.
    ///
    /// Format: `[recalc/full]   14ms  628 cells  depth=7  cycles=0`
    pub fn log_line(&self) -> String {
        format!(
            "[recalc/full] {:>4}ms  {} cells  depth={}  cycles={}",
            self.duration_ms,
            self.cells_recomputed,
            self.max_depth,
            if self.had_cycles { 1 } else { 0 },
        )
    }
}

/// A circular reference that caused an edit or recompute to be rejected.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CycleError {
    /// Cells participating in the cycle. May be a subset for large cycles.
    pub cells: Vec<CellCoord>,

    /// Human-readable description of the cycle.
    pub message: String,
}

impl CycleError {
    pub fn new(cells: Vec<CellCoord>, message: impl Into<String>) -> Self {
        Self { cells, message: message.into() }
    }

    /// A cell that references itself, directly or through a range that
    /// covers it.
    pub fn self_reference(cell: CellCoord) -> Self {
        Self {
            cells: vec![cell],
            message: format!("Cell {} references itself", cell),
        }
    }

    /// A multi-cell cycle.
    pub fn cycle(cells: Vec<CellCoord>) -> Self {
        let labels: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let message = if cells.len() <= 5 {
            format!("Circular reference: {}", labels.join(" → "))
        } else {
            format!(
                "Circular reference involving {} cells: {} → ... → {}",
                cells.len(),
                labels[0],
                labels.last().unwrap()
            )
        };
        Self { cells, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col)
    }

    #[test]
    fn test_report_summary() {
        let report = RecalcReport {
            duration_ms: 42,
            cells_recomputed: 100,
            max_depth: 5,
            had_cycles: false,
        };
        assert_eq!(report.summary(), "100 cells in 42ms, depth=5, cycles=false");
    }

    #[test]
    fn test_report_log_line() {
        let report = RecalcReport {
            duration_ms: 14,
            cells_recomputed: 628,
            max_depth: 7,
            had_cycles: false,
        };
        assert_eq!(report.log_line(), "[recalc/full]   14ms  628 cells  depth=7  cycles=0");
    }

    #[test]
    fn test_cycle_self_reference_message() {
        let err = CycleError::self_reference(cell(0, 0));
        assert_eq!(err.cells, vec![cell(0, 0)]);
        assert!(err.message.contains("references itself"));
        assert!(err.message.contains("A1"));
    }

    #[test]
    fn test_cycle_small_message() {
        let err = CycleError::cycle(vec![cell(0, 0), cell(0, 1), cell(0, 2)]);
        assert!(err.message.contains("→"));
        assert!(!err.message.contains("..."));
    }

    #[test]
    fn test_cycle_large_message_truncated() {
        let err = CycleError::cycle((0..10).map(|r| cell(r, 0)).collect());
        assert!(err.message.contains("..."));
        assert!(err.message.contains("10 cells"));
    }

    #[test]
    fn test_cycle_error_display() {
        let err = CycleError::new(vec![cell(0, 0)], "Test error");
        assert_eq!(format!("{}", err), "Test error");
    }
}
