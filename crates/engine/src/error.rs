//! Engine error taxonomy.
//!
//! Every failure the engine can surface to a cell is one of these kinds,
//! carried inside `CellValue::Error`. Nothing here is a panic or an
//! exception crossing the engine boundary; errors are values the caller
//! (and other formulas) inspect.

use serde::{Deserialize, Serialize};

/// The closed set of cell-level error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Formula text that failed to parse.
    Syntax,
    /// Reference to a nonexistent or deleted coordinate.
    Ref,
    /// Type mismatch, e.g. non-numeric text in arithmetic.
    Value,
    /// Division by zero (also AVERAGE over zero values).
    Div,
    /// Edit rejected because it would create a circular reference.
    Circular,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Syntax => "#SYNTAX!",
            Self::Ref => "#REF!",
            Self::Value => "#VALUE!",
            Self::Div => "#DIV/0!",
            Self::Circular => "#CIRC!",
        })
    }
}
