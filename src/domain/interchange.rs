//! Text interchange for rectangular regions: tab-separated text for the
//! clipboard and CSV for files.
//!
//! Both directions move raw values (formulas stay formulas), never evaluated
//! results.

use super::address::{CellId, CellPosition, Range};
use super::errors::{ExportError, ImportError};
use super::models::{CellStore, GridData, GridDimensions};

pub const CELL_DELIMITER: char = '\t';
pub const ROW_DELIMITER: char = '\n';
pub const BYTE_ORDER_MARK: &str = "\u{feff}";

/// Serializes the raw values of `range`, tab-separated, one row per line.
pub fn serialize_range(range: Range, store: &CellStore) -> String {
    let bounds = range.bounds();
    (bounds.min_row..=bounds.max_row)
        .map(|row| {
            (bounds.min_col..=bounds.max_col)
                .map(|col| store.get_at(CellPosition::new(row, col)).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(&CELL_DELIMITER.to_string())
        })
        .collect::<Vec<_>>()
        .join(&ROW_DELIMITER.to_string())
}

/// Splits clipboard text into rows of fields. `\r\n` is accepted and a single
/// trailing line break is ignored.
pub fn parse_clipboard_text(text: &str) -> Vec<Vec<String>> {
    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.strip_suffix(ROW_DELIMITER).unwrap_or(&normalized);
    trimmed
        .split(ROW_DELIMITER)
        .map(|line| line.split(CELL_DELIMITER).map(str::to_string).collect())
        .collect()
}

/// Writes `text` into the store starting at `origin`.
///
/// Non-empty fields are written, empty fields delete. Fields landing outside
/// `dims` are dropped. Returns the pasted rectangle clipped to the grid, or
/// `None` when nothing landed inside it.
pub fn deserialize_and_paste(
    text: &str,
    origin: CellPosition,
    store: &mut CellStore,
    dims: GridDimensions,
) -> Option<Range> {
    if !dims.contains(origin) {
        return None;
    }

    let rows = parse_clipboard_text(text);
    let height = rows.len();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if height == 0 || width == 0 {
        return None;
    }

    for (row_offset, fields) in rows.iter().enumerate() {
        for (col_offset, field) in fields.iter().enumerate() {
            let target = CellPosition::new(origin.row + row_offset, origin.col + col_offset);
            if !dims.contains(target) {
                continue;
            }
            store.set(CellId::from(target), field);
        }
    }

    let far = CellPosition::new(
        (origin.row + height - 1).min(dims.rows - 1),
        (origin.col + width - 1).min(dims.cols - 1),
    );
    Some(Range::new(origin, far))
}

/// Serializes the whole addressable grid as CSV with a leading byte-order
/// mark. Fields are quoted only when they contain a comma, quote or line
/// break.
pub fn export_csv(store: &CellStore, dims: GridDimensions) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for row in 0..dims.rows {
        let record: Vec<&str> = (0..dims.cols)
            .map(|col| store.get_at(CellPosition::new(row, col)).unwrap_or(""))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner()?;
    let body = String::from_utf8_lossy(&bytes);
    Ok(format!("{BYTE_ORDER_MARK}{body}"))
}

/// Result of parsing a CSV document into grid data.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvImport {
    pub data: GridData,
    pub rows: usize,
    pub cols: usize,
}

/// Parses CSV text into sparse grid data. Every record must have the same
/// number of fields.
pub fn import_csv(text: &str) -> Result<CsvImport, ImportError> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ImportError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut cells = Vec::new();
    let mut rows = 0;
    let mut cols: Option<usize> = None;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let expected = *cols.get_or_insert(record.len());
        if record.len() != expected {
            return Err(ImportError::ShapeMismatch {
                line: record.position().map(|p| p.line()).unwrap_or(row as u64 + 1),
                expected,
                found: record.len(),
            });
        }
        for (col, field) in record.iter().enumerate() {
            if !field.trim().is_empty() {
                cells.push((CellId::from(CellPosition::new(row, col)), field.to_string()));
            }
        }
        rows = row + 1;
    }

    Ok(CsvImport {
        data: cells.into_iter().collect(),
        rows,
        cols: cols.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> CellId {
        text.parse().unwrap()
    }

    fn p(row: usize, col: usize) -> CellPosition {
        CellPosition::new(row, col)
    }

    #[test]
    fn test_serialize_range_uses_raw_values() {
        let mut store = CellStore::default();
        store.set(id("A1"), "1");
        store.set(id("B1"), "=A1*2");
        store.set(id("B2"), "x");

        let text = serialize_range(Range::new(p(1, 1), p(0, 0)), &store);
        assert_eq!(text, "1\t=A1*2\n\tx");
    }

    #[test]
    fn test_paste_writes_and_deletes() {
        let mut store = CellStore::default();
        store.set(id("B1"), "old");

        let pasted = deserialize_and_paste("a\t\nc\td", p(0, 0), &mut store, GridDimensions::new(5, 5));
        assert_eq!(pasted, Some(Range::new(p(0, 0), p(1, 1))));
        assert_eq!(store.get(id("A1")), Some("a"));
        assert_eq!(store.get(id("B1")), None);
        assert_eq!(store.get(id("A2")), Some("c"));
        assert_eq!(store.get(id("B2")), Some("d"));
    }

    #[test]
    fn test_paste_clips_to_grid() {
        let dims = GridDimensions::new(4, 4);
        let mut store = CellStore::default();
        let block = "1\t2\t3\n4\t5\t6\n7\t8\t9";

        let pasted = deserialize_and_paste(block, dims.last(), &mut store, dims);
        assert_eq!(pasted, Some(Range::single(p(3, 3))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id("D4")), Some("1"));
    }

    #[test]
    fn test_paste_ignores_trailing_newline_and_crlf() {
        let mut store = CellStore::default();
        store.set(id("A3"), "keep");
        let pasted = deserialize_and_paste("x\r\ny\r\n", p(0, 0), &mut store, GridDimensions::new(5, 5));
        assert_eq!(pasted, Some(Range::new(p(0, 0), p(1, 0))));
        assert_eq!(store.get(id("A1")), Some("x"));
        assert_eq!(store.get(id("A2")), Some("y"));
        assert_eq!(store.get(id("A3")), Some("keep"));
    }

    #[test]
    fn test_copy_paste_round_trip() {
        let mut source = CellStore::default();
        source.set(id("A1"), "1");
        source.set(id("B2"), "=SUM(A1:A2)");
        let text = serialize_range(Range::new(p(0, 0), p(1, 1)), &source);

        let mut target = CellStore::default();
        deserialize_and_paste(&text, p(2, 2), &mut target, GridDimensions::new(10, 10));
        assert_eq!(target.get(id("C3")), Some("1"));
        assert_eq!(target.get(id("D4")), Some("=SUM(A1:A2)"));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_export_csv_covers_whole_grid_with_bom() {
        let mut store = CellStore::default();
        store.set(id("A1"), "plain");
        store.set(id("B1"), "a,b");
        store.set(id("A2"), "say \"hi\"");
        store.set(id("B2"), "two\nlines");

        let csv = export_csv(&store, GridDimensions::new(3, 2)).unwrap();
        assert!(csv.starts_with(BYTE_ORDER_MARK));
        let body = &csv[BYTE_ORDER_MARK.len()..];
        assert_eq!(body, "plain,\"a,b\"\n\"say \"\"hi\"\"\",\"two\nlines\"\n,\n");
    }

    #[test]
    fn test_csv_round_trip() {
        let mut store = CellStore::default();
        store.set(id("A1"), "10");
        store.set(id("C1"), "=A1+1");
        store.set(id("B3"), "x, \"y\"");
        let dims = GridDimensions::new(4, 3);

        let imported = import_csv(&export_csv(&store, dims).unwrap()).unwrap();
        assert_eq!(imported.data, store.snapshot());
        assert_eq!((imported.rows, imported.cols), (4, 3));
    }

    #[test]
    fn test_import_rejects_empty() {
        assert!(matches!(import_csv(""), Err(ImportError::Empty)));
        assert!(matches!(import_csv("\u{feff}  \n"), Err(ImportError::Empty)));
    }

    #[test]
    fn test_import_rejects_ragged_rows() {
        let err = import_csv("a,b\nc\n").unwrap_err();
        match err {
            ImportError::ShapeMismatch { line, expected, found } => {
                assert_eq!((line, expected, found), (2, 2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_import_keeps_sparse_invariant() {
        let imported = import_csv("1,,3\n,,\n").unwrap();
        assert_eq!(imported.data.len(), 2);
        assert_eq!((imported.rows, imported.cols), (2, 3));
    }
}
