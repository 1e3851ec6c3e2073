//! The scalar primitive for all cell values.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// What a cell evaluates to. This is the only thing the UI layer and
/// other formulas ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorKind),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    /// Coerce to a number for arithmetic.
    ///
    /// Text participates only if it parses as a number after trimming
    /// surrounding whitespace; the empty string is not numeric. Empty
    /// cells read as empty text here (aggregate functions treat them
    /// differently, see `formula::functions`).
    pub fn to_number(&self) -> Result<f64, ErrorKind> {
        match self {
            CellValue::Number(n) => Ok(*n),
            CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ErrorKind::Value);
                }
                trimmed.parse::<f64>().map_err(|_| ErrorKind::Value)
            }
            CellValue::Empty => Err(ErrorKind::Value),
            CellValue::Error(kind) => Err(*kind),
        }
    }

    /// Numeric reading of text, used by aggregate collection. `None`
    /// means "not numeric", which aggregates skip rather than error on.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Stringify for text contexts (TRIM/UPPER/LOWER, concatenation of
    /// display output). Non-text values are rendered, never rejected.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            CellValue::Empty => String::new(),
            CellValue::Error(kind) => kind.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}
