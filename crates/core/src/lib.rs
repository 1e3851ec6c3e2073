pub mod coord;
pub mod range;

pub use coord::{col_to_letters, letters_to_col, CellCoord};
pub use range::CellRange;
