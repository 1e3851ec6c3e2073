//! Formula evaluation.
//!
//! Evaluation is pure over a snapshot of current cell values: the
//! evaluator never triggers recomputation of other cells, it only reads
//! what the [`ValueSource`] reports. Ordering is the scheduler's job.

use gridcalc_core::CellCoord;

use crate::error::ErrorKind;
use crate::formula::functions;
use crate::formula::parser::{BinOp, Expr, UnOp};
use crate::value::CellValue;

/// Read access to current cell values. Implemented by the grid; tests
/// substitute a plain map.
pub trait ValueSource {
    fn value(&self, coord: CellCoord) -> CellValue;
}

/// Evaluate an expression against current cell values.
///
/// Total: every expression yields a `CellValue`, with failures encoded
/// as `CellValue::Error`. Errors are viral through arithmetic and
/// comparison; the leftmost error wins when both operands carry one.
pub fn evaluate<S: ValueSource>(expr: &Expr, source: &S) -> CellValue {
    match expr {
        Expr::Number(n) => CellValue::Number(*n),
        Expr::Text(s) => CellValue::Text(s.clone()),
        Expr::Boolean(b) => CellValue::Boolean(*b),
        Expr::CellRef(coord) => source.value(*coord),
        // A bare range is only meaningful as a function argument
        Expr::Range(_) => CellValue::Error(ErrorKind::Value),
        Expr::RefDeleted => CellValue::Error(ErrorKind::Ref),
        Expr::Function { name, args } => functions::call(name, args, source),
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, source);
            let rhs = evaluate(right, source);
            match op {
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                    eval_arithmetic(*op, &lhs, &rhs)
                }
                _ => eval_comparison(*op, &lhs, &rhs),
            }
        }
        Expr::Unary { op: UnOp::Neg, operand } => match evaluate(operand, source).to_number() {
            Ok(n) => CellValue::Number(-n),
            Err(kind) => CellValue::Error(kind),
        },
    }
}

fn eval_arithmetic(op: BinOp, lhs: &CellValue, rhs: &CellValue) -> CellValue {
    let a = match lhs.to_number() {
        Ok(n) => n,
        Err(kind) => return CellValue::Error(kind),
    };
    let b = match rhs.to_number() {
        Ok(n) => n,
        Err(kind) => return CellValue::Error(kind),
    };
    match op {
        BinOp::Add => CellValue::Number(a + b),
        BinOp::Sub => CellValue::Number(a - b),
        BinOp::Mul => CellValue::Number(a * b),
        BinOp::Div => {
            if b == 0.0 {
                CellValue::Error(ErrorKind::Div)
            } else {
                CellValue::Number(a / b)
            }
        }
        _ => unreachable!("comparison routed to eval_comparison"),
    }
}

/// Compare numerically when both sides coerce to numbers, otherwise as
/// case-insensitive text. Errors on either side win.
fn eval_comparison(op: BinOp, lhs: &CellValue, rhs: &CellValue) -> CellValue {
    if let CellValue::Error(kind) = lhs {
        return CellValue::Error(*kind);
    }
    if let CellValue::Error(kind) = rhs {
        return CellValue::Error(*kind);
    }

    let ordering = match (lhs.to_number(), rhs.to_number()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(lhs.to_text().to_lowercase().cmp(&rhs.to_text().to_lowercase())),
    };
    let Some(ordering) = ordering else {
        // NaN on either side
        return CellValue::Boolean(matches!(op, BinOp::NotEq));
    };

    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Eq => ordering.is_eq(),
        BinOp::LtEq => ordering.is_le(),
        BinOp::GtEq => ordering.is_ge(),
        BinOp::NotEq => ordering.is_ne(),
        _ => unreachable!("arithmetic routed to eval_arithmetic"),
    };
    CellValue::Boolean(result)
}
