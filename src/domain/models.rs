use super::address::{CellId, CellPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored cell: a literal or a formula beginning with `=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    #[serde(rename = "rawValue")]
    pub raw_value: String,
}

impl GridCell {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Self { raw_value: raw_value.into() }
    }
}

/// Sparse cell map. No entry ever holds an empty raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GridData {
    cells: BTreeMap<CellId, GridCell>,
}

impl GridData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: CellId) -> Option<&GridCell> {
        self.cells.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &GridCell)> {
        self.cells.iter()
    }

    fn insert(&mut self, id: CellId, raw_value: &str) {
        if raw_value.trim().is_empty() {
            self.cells.remove(&id);
        } else {
            self.cells.insert(id, GridCell::new(raw_value));
        }
    }

    /// Largest occupied row and column, if any cell is stored.
    pub fn extent(&self) -> Option<CellPosition> {
        self.cells.keys().map(|id| id.position()).fold(None, |acc, pos| {
            Some(match acc {
                None => pos,
                Some(max) => CellPosition::new(max.row.max(pos.row), max.col.max(pos.col)),
            })
        })
    }
}

impl FromIterator<(CellId, String)> for GridData {
    fn from_iter<I: IntoIterator<Item = (CellId, String)>>(iter: I) -> Self {
        let mut data = GridData::new();
        for (id, raw) in iter {
            data.insert(id, &raw);
        }
        data
    }
}

impl<'de> Deserialize<'de> for GridData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut cells = BTreeMap::<CellId, GridCell>::deserialize(deserializer)?;
        cells.retain(|_, cell| !cell.raw_value.trim().is_empty());
        Ok(Self { cells })
    }
}

/// Addressable size of the grid. Dimensions only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self { rows: 100, cols: 26 }
    }
}

impl GridDimensions {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows: rows.max(1), cols: cols.max(1) }
    }

    pub fn contains(&self, pos: CellPosition) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn clamp(&self, pos: CellPosition) -> CellPosition {
        CellPosition::new(pos.row.min(self.rows - 1), pos.col.min(self.cols - 1))
    }

    pub fn last(&self) -> CellPosition {
        CellPosition::new(self.rows - 1, self.cols - 1)
    }

    pub fn add_rows(&mut self, count: usize) {
        self.rows = self.rows.saturating_add(count);
    }

    pub fn add_cols(&mut self, count: usize) {
        self.cols = self.cols.saturating_add(count);
    }

    /// Grows (never shrinks) so that `pos` is addressable.
    pub fn grow_to_fit(&mut self, pos: CellPosition) {
        self.rows = self.rows.max(pos.row + 1);
        self.cols = self.cols.max(pos.col + 1);
    }
}

/// Single source of truth for raw cell text.
///
/// The store keeps no history of its own: callers that mutate it push a
/// snapshot into the history first.
///
/// # Examples
///
/// ```
/// use cellgrid::domain::{CellId, CellStore};
///
/// let mut store = CellStore::default();
/// let a1: CellId = "A1".parse().unwrap();
///
/// store.set(a1, "42");
/// assert_eq!(store.get(a1), Some("42"));
///
/// store.set(a1, "   ");
/// assert_eq!(store.get(a1), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStore {
    data: GridData,
}

impl CellStore {
    pub fn new(data: GridData) -> Self {
        Self { data }
    }

    pub fn get(&self, id: CellId) -> Option<&str> {
        self.data.get(id).map(|cell| cell.raw_value.as_str())
    }

    pub fn get_at(&self, pos: CellPosition) -> Option<&str> {
        self.get(CellId::from(pos))
    }

    /// Writes a raw value. Empty or whitespace-only text deletes the entry.
    pub fn set(&mut self, id: CellId, raw_value: &str) {
        self.data.insert(id, raw_value);
    }

    /// Returns whether an entry was removed.
    pub fn delete(&mut self, id: CellId) -> bool {
        self.data.cells.remove(&id).is_some()
    }

    pub fn replace_all(&mut self, data: GridData) {
        self.data = data;
    }

    pub fn snapshot(&self) -> GridData {
        self.data.clone()
    }

    pub fn data(&self) -> &GridData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> CellId {
        text.parse().unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut store = CellStore::default();
        store.set(id("B2"), "hello");
        assert_eq!(store.get(id("B2")), Some("hello"));
        assert_eq!(store.get_at(CellPosition::new(1, 1)), Some("hello"));
        assert_eq!(store.get(id("A1")), None);
    }

    #[test]
    fn test_empty_write_deletes() {
        let mut store = CellStore::default();
        store.set(id("A1"), "x");
        store.set(id("A1"), "");
        assert_eq!(store.get(id("A1")), None);
        assert!(store.is_empty());

        store.set(id("A1"), "x");
        store.set(id("A1"), " \t ");
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_reports_removal() {
        let mut store = CellStore::default();
        store.set(id("C3"), "1");
        assert!(store.delete(id("C3")));
        assert!(!store.delete(id("C3")));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut store = CellStore::default();
        store.set(id("A1"), "1");
        let snapshot = store.snapshot();

        store.set(id("A1"), "2");
        store.set(id("A2"), "3");

        assert_eq!(snapshot.get(id("A1")).map(|c| c.raw_value.as_str()), Some("1"));
        assert_eq!(snapshot.len(), 1);

        store.replace_all(snapshot.clone());
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn test_grid_data_json_shape() {
        let data: GridData = [(id("A1"), "10".to_string()), (id("B2"), "=A1*2".to_string())]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"A1":{"rawValue":"10"},"B2":{"rawValue":"=A1*2"}}"#);

        let back: GridData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_deserialize_drops_empty_entries() {
        let json = r#"{"A1":{"rawValue":""},"A2":{"rawValue":"x"}}"#;
        let data: GridData = serde_json::from_str(json).unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.get(id("A1")).is_none());
    }

    #[test]
    fn test_deserialize_rejects_bad_keys() {
        let json = r#"{"1A":{"rawValue":"x"}}"#;
        assert!(serde_json::from_str::<GridData>(json).is_err());
    }

    #[test]
    fn test_extent() {
        let data: GridData = [(id("C1"), "a".to_string()), (id("A4"), "b".to_string())]
            .into_iter()
            .collect();
        assert_eq!(data.extent(), Some(CellPosition::new(3, 2)));
        assert_eq!(GridData::new().extent(), None);
    }

    #[test]
    fn test_dimensions_only_grow() {
        let mut dims = GridDimensions::new(5, 5);
        dims.grow_to_fit(CellPosition::new(2, 2));
        assert_eq!(dims, GridDimensions::new(5, 5));
        dims.grow_to_fit(CellPosition::new(9, 6));
        assert_eq!(dims, GridDimensions::new(10, 7));
        dims.add_rows(1);
        dims.add_cols(2);
        assert_eq!((dims.rows, dims.cols), (11, 9));
        assert!(dims.contains(CellPosition::new(10, 8)));
        assert!(!dims.contains(CellPosition::new(11, 0)));
        assert_eq!(dims.clamp(CellPosition::new(50, 50)), CellPosition::new(10, 8));
    }
}
