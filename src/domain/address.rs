//! Cell addressing: conversions between `(row, col)` coordinates and
//! "A1"-style identifiers, plus rectangular ranges.

use super::errors::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Zero-based grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Offsets this position, returning `None` if either axis would go negative
    /// or overflow.
    pub fn offset(self, row_delta: isize, col_delta: isize) -> Option<Self> {
        Some(Self {
            row: self.row.checked_add_signed(row_delta)?,
            col: self.col.checked_add_signed(col_delta)?,
        })
    }
}

/// Encodes a zero-based column index as bijective base-26 letters.
///
/// # Examples
///
/// ```
/// use cellgrid::domain::col_to_letter;
///
/// assert_eq!(col_to_letter(0), "A");
/// assert_eq!(col_to_letter(25), "Z");
/// assert_eq!(col_to_letter(26), "AA");
/// assert_eq!(col_to_letter(701), "ZZ");
/// ```
pub fn col_to_letter(col: usize) -> String {
    let mut letters = Vec::new();
    let mut c = col;
    loop {
        letters.push(b'A' + (c % 26) as u8);
        if c < 26 {
            break;
        }
        c = c / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Decodes column letters (case-insensitive) back to a zero-based index.
///
/// Returns `None` for empty input, non-letters, or values that overflow `usize`.
pub fn letter_to_col(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut result: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

/// Formats a position as its cell id, e.g. `(0, 0)` → `"A1"`.
pub fn get_cell_id(pos: CellPosition) -> String {
    format!("{}{}", col_to_letter(pos.col), pos.row + 1)
}

/// Parses an id matching `^[A-Za-z]+\d+$` into a position.
///
/// Row numbers are 1-based in the id, so `"A0"` does not decode.
pub fn parse_cell_id(id: &str) -> Result<CellPosition, AddressError> {
    let invalid = || AddressError::InvalidCellId(id.to_string());

    let split = id
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(invalid)?;
    let (letters, digits) = id.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let col = letter_to_col(letters).ok_or_else(invalid)?;
    let row = digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(invalid)?;

    Ok(CellPosition { row, col })
}

/// Value-typed cell identifier used as the key of the sparse cell map.
///
/// Displays and serializes as the "A1"-style string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(CellPosition);

impl CellId {
    pub fn position(self) -> CellPosition {
        self.0
    }
}

impl From<CellPosition> for CellId {
    fn from(pos: CellPosition) -> Self {
        Self(pos)
    }
}

impl FromStr for CellId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cell_id(s).map(Self)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.0.col), self.0.row + 1)
    }
}

impl Serialize for CellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Two corner positions. The corners are kept as given; use [`Range::bounds`]
/// for the normalized rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: CellPosition,
    pub end: CellPosition,
}

/// Normalized rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl Bounds {
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    /// Row-major iterator over every position in the rectangle.
    pub fn positions(self) -> impl Iterator<Item = CellPosition> {
        (self.min_row..=self.max_row)
            .flat_map(move |row| (self.min_col..=self.max_col).map(move |col| CellPosition { row, col }))
    }
}

impl Range {
    pub fn new(start: CellPosition, end: CellPosition) -> Self {
        Self { start, end }
    }

    pub fn single(pos: CellPosition) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_row: self.start.row.min(self.end.row),
            max_row: self.start.row.max(self.end.row),
            min_col: self.start.col.min(self.end.col),
            max_col: self.start.col.max(self.end.col),
        }
    }

    pub fn contains(&self, pos: CellPosition) -> bool {
        let b = self.bounds();
        (b.min_row..=b.max_row).contains(&pos.row) && (b.min_col..=b.max_col).contains(&pos.col)
    }

    /// Parses `"A1:C3"`. A lone id parses as a single-cell range.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        match text.split_once(':') {
            Some((start, end)) => Ok(Self {
                start: parse_cell_id(start.trim())?,
                end: parse_cell_id(end.trim())?,
            }),
            None => parse_cell_id(text.trim()).map(Self::single),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", get_cell_id(self.start), get_cell_id(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(1), "B");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
        assert_eq!(col_to_letter(51), "AZ");
        assert_eq!(col_to_letter(52), "BA");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn test_letter_to_col_case_insensitive() {
        assert_eq!(letter_to_col("a"), Some(0));
        assert_eq!(letter_to_col("aa"), Some(26));
        assert_eq!(letter_to_col("Zz"), Some(701));
        assert_eq!(letter_to_col(""), None);
        assert_eq!(letter_to_col("A1"), None);
    }

    #[test]
    fn test_get_cell_id() {
        assert_eq!(get_cell_id(CellPosition::new(0, 0)), "A1");
        assert_eq!(get_cell_id(CellPosition::new(9, 27)), "AB10");
    }

    #[test]
    fn test_parse_cell_id() {
        assert_eq!(parse_cell_id("A1"), Ok(CellPosition::new(0, 0)));
        assert_eq!(parse_cell_id("b3"), Ok(CellPosition::new(2, 1)));
        assert_eq!(parse_cell_id("AA10"), Ok(CellPosition::new(9, 26)));
    }

    #[test]
    fn test_parse_cell_id_rejects_malformed() {
        for bad in ["", "A", "1", "1A", "A0", "A-1", "A1B", "A 1", "$A$1", "A1.5"] {
            assert!(parse_cell_id(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_cell_id_display_and_parse() {
        let id: CellId = "c7".parse().unwrap();
        assert_eq!(id.position(), CellPosition::new(6, 2));
        assert_eq!(id.to_string(), "C7");
    }

    #[test]
    fn test_range_bounds_normalize_each_axis() {
        let range = Range::new(CellPosition::new(4, 0), CellPosition::new(1, 3));
        let b = range.bounds();
        assert_eq!((b.min_row, b.max_row, b.min_col, b.max_col), (1, 4, 0, 3));
        assert_eq!(b.height(), 4);
        assert_eq!(b.width(), 4);
        assert!(range.contains(CellPosition::new(2, 2)));
        assert!(!range.contains(CellPosition::new(0, 2)));
        assert!(!range.contains(CellPosition::new(2, 4)));
    }

    #[test]
    fn test_range_parse() {
        let range = Range::parse("B2:a1").unwrap();
        assert_eq!(range.start, CellPosition::new(1, 1));
        assert_eq!(range.end, CellPosition::new(0, 0));
        assert_eq!(range.to_string(), "B2:A1");
        assert!(Range::parse("A1:").is_err());
    }

    #[test]
    fn test_bounds_positions_row_major() {
        let range = Range::new(CellPosition::new(0, 0), CellPosition::new(1, 1));
        let ids: Vec<String> = range.bounds().positions().map(get_cell_id).collect();
        assert_eq!(ids, vec!["A1", "B1", "A2", "B2"]);
    }

    proptest! {
        #[test]
        fn prop_cell_id_round_trip(row in 0usize..1_000_000, col in 0usize..20_000) {
            let pos = CellPosition::new(row, col);
            prop_assert_eq!(parse_cell_id(&get_cell_id(pos)), Ok(pos));
        }

        #[test]
        fn prop_column_round_trip(col in 0usize..1_000_000) {
            prop_assert_eq!(letter_to_col(&col_to_letter(col)), Some(col));
        }

        #[test]
        fn prop_column_letters_strictly_increasing(col in 0usize..1_000_000) {
            let a = col_to_letter(col);
            let b = col_to_letter(col + 1);
            // Bijective base-26 orders by length first, then lexicographically.
            prop_assert!((a.len(), &a) < (b.len(), &b));
        }
    }
}
