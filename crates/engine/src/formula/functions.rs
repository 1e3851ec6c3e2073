//! Built-in spreadsheet functions.
//!
//! Aggregates (SUM, AVERAGE, MAX, MIN, COUNT) take any mix of scalar and
//! range arguments. Text helpers (TRIM, UPPER, LOWER) take exactly one
//! scalar argument. Function names are case-sensitive; anything not
//! recognized evaluates to a value error rather than failing the parse,
//! so adding a function never changes what parses.

use crate::error::ErrorKind;
use crate::formula::eval::{evaluate, ValueSource};
use crate::formula::parser::Expr;
use crate::value::CellValue;

/// Dispatch a function call by name.
pub fn call<S: ValueSource>(name: &str, args: &[Expr], source: &S) -> CellValue {
    match name {
        "SUM" => aggregate(args, source, |nums| CellValue::Number(nums.iter().sum())),
        "AVERAGE" => aggregate(args, source, |nums| {
            if nums.is_empty() {
                CellValue::Error(ErrorKind::Div)
            } else {
                CellValue::Number(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }),
        // MAX/MIN over nothing numeric report 0 rather than an error
        "MAX" => aggregate(args, source, |nums| {
            CellValue::Number(nums.iter().copied().reduce(f64::max).unwrap_or(0.0))
        }),
        "MIN" => aggregate(args, source, |nums| {
            CellValue::Number(nums.iter().copied().reduce(f64::min).unwrap_or(0.0))
        }),
        "COUNT" => aggregate(args, source, |nums| CellValue::Number(nums.len() as f64)),
        "TRIM" => text_fn(args, source, |s| s.trim().to_string()),
        "UPPER" => text_fn(args, source, |s| s.to_uppercase()),
        "LOWER" => text_fn(args, source, |s| s.to_lowercase()),
        _ => CellValue::Error(ErrorKind::Value),
    }
}

fn aggregate<S, F>(args: &[Expr], source: &S, finish: F) -> CellValue
where
    S: ValueSource,
    F: FnOnce(&[f64]) -> CellValue,
{
    match collect_numbers(args, source) {
        Ok(nums) => finish(&nums),
        Err(kind) => CellValue::Error(kind),
    }
}

/// Gather the numeric inputs of an aggregate call.
///
/// Range arguments iterate their cells in row-major order: empty cells,
/// non-numeric text, and booleans are skipped, while error values
/// propagate. Scalar arguments are stricter: empty reads as 0 and
/// non-numeric text is a value error.
fn collect_numbers<S: ValueSource>(args: &[Expr], source: &S) -> Result<Vec<f64>, ErrorKind> {
    let mut nums = Vec::new();
    for arg in args {
        match arg {
            Expr::Range(range) => {
                for coord in range.iter() {
                    let value = source.value(coord);
                    if let CellValue::Error(kind) = value {
                        return Err(kind);
                    }
                    if let Some(n) = value.as_numeric() {
                        nums.push(n);
                    }
                }
            }
            _ => {
                let value = evaluate(arg, source);
                match value {
                    CellValue::Empty => nums.push(0.0),
                    other => nums.push(other.to_number()?),
                }
            }
        }
    }
    Ok(nums)
}

fn text_fn<S, F>(args: &[Expr], source: &S, transform: F) -> CellValue
where
    S: ValueSource,
    F: FnOnce(&str) -> String,
{
    if args.len() != 1 || matches!(args[0], Expr::Range(_)) {
        return CellValue::Error(ErrorKind::Value);
    }
    match evaluate(&args[0], source) {
        CellValue::Error(kind) => CellValue::Error(kind),
        value => CellValue::Text(transform(&value.to_text())),
    }
}
