//! Cell coordinates and A1-style labels.
//!
//! A `CellCoord` identifies one cell by 0-based (row, column). Column
//! labels use bijective base-26: digits run A..=Z with values 1..=26 and
//! there is no zero digit, which is why 25 → "Z" but 26 → "AA".

use serde::{Deserialize, Serialize};

/// A single cell position: 0-based row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style label ("B3", "AA10") into a coordinate.
    ///
    /// Strict form: one or more uppercase letters followed by a 1-based
    /// row number. Anything else (lowercase, missing row, row 0) is `None`.
    pub fn parse(label: &str) -> Option<CellCoord> {
        let split = label.find(|c: char| !c.is_ascii_uppercase())?;
        let (letters, digits) = label.split_at(split);
        if letters.is_empty() || digits.is_empty() {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let col = letters_to_col(letters)?;
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellCoord::new(row - 1, col))
    }

    /// Render as an A1-style label.
    pub fn label(&self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row + 1)
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Convert a 0-based column index to its letter label: 0 → A, 25 → Z, 26 → AA.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1; // shift to the 1-based bijective representation
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Convert a column letter label back to its 0-based index.
///
/// Exact inverse of [`col_to_letters`]. Rejects empty strings and any
/// non-uppercase character.
pub fn letters_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut col: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        // Digit values are 1..=26, not 0..=25; naive base-26 is off by
        // one for every column past Z.
        col = col * 26 + (c as usize - 'A' as usize + 1);
    }
    Some(col - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_to_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(1), "B");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(27), "AB");
        assert_eq!(col_to_letters(701), "ZZ");
        assert_eq!(col_to_letters(702), "AAA");
    }

    #[test]
    fn test_letters_to_col() {
        assert_eq!(letters_to_col("A"), Some(0));
        assert_eq!(letters_to_col("Z"), Some(25));
        assert_eq!(letters_to_col("AA"), Some(26));
        assert_eq!(letters_to_col("ZZ"), Some(701));
        assert_eq!(letters_to_col("AAA"), Some(702));
        assert_eq!(letters_to_col(""), None);
        assert_eq!(letters_to_col("a"), None);
        assert_eq!(letters_to_col("A1"), None);
    }

    #[test]
    fn test_roundtrip_all_boundaries() {
        // Exhaustive through three letters, plus spot checks beyond
        for col in 0..20_000usize {
            assert_eq!(letters_to_col(&col_to_letters(col)), Some(col), "col {}", col);
        }
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(CellCoord::parse("A1"), Some(CellCoord::new(0, 0)));
        assert_eq!(CellCoord::parse("B3"), Some(CellCoord::new(2, 1)));
        assert_eq!(CellCoord::parse("AA10"), Some(CellCoord::new(9, 26)));
        assert_eq!(CellCoord::parse("A0"), None);
        assert_eq!(CellCoord::parse("A"), None);
        assert_eq!(CellCoord::parse("1"), None);
        assert_eq!(CellCoord::parse("a1"), None);
        assert_eq!(CellCoord::parse("A1B"), None);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(CellCoord::new(0, 0).label(), "A1");
        assert_eq!(CellCoord::new(9, 26).label(), "AA10");
        assert_eq!(format!("{}", CellCoord::new(2, 1)), "B3");
    }

    #[test]
    fn test_parse_label_inverse() {
        for (row, col) in [(0, 0), (4, 25), (99, 26), (0, 701), (12, 702)] {
            let coord = CellCoord::new(row, col);
            assert_eq!(CellCoord::parse(&coord.label()), Some(coord));
        }
    }
}
