//! Snapshot-based undo/redo.

use super::models::GridData;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Ordered list of full-grid snapshots with a cursor.
///
/// Callers [`push`](HistoryStack::push) the state *before* each mutation.
/// The live state after the newest mutation is not stored until the first
/// undo, which appends it so that a later redo can return to it.
///
/// # Examples
///
/// ```
/// use cellgrid::domain::{CellStore, HistoryStack};
///
/// let mut store = CellStore::default();
/// let mut history = HistoryStack::default();
///
/// history.push(store.snapshot());
/// store.set("A1".parse().unwrap(), "1");
///
/// let before = history.undo(&store.snapshot()).unwrap();
/// assert!(before.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<GridData>,
    cursor: usize,
    /// The live state is newer than `entries[cursor]`.
    tip_pending: bool,
    limit: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryStack {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            tip_pending: false,
            limit: limit.max(2),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.tip_pending || self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.tip_pending && self.cursor + 1 < self.entries.len()
    }

    /// Records the pre-mutation state, discarding any redo branch.
    pub fn push(&mut self, snapshot: GridData) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        if self.entries.last() != Some(&snapshot) {
            self.entries.push(snapshot);
        }
        self.cursor = self.entries.len() - 1;
        self.tip_pending = true;
        self.enforce_limit();
    }

    /// Steps back one entry. `current` is the live state, recorded on the
    /// first undo after a mutation. Returns `None` when there is nothing older.
    pub fn undo(&mut self, current: &GridData) -> Option<GridData> {
        if self.tip_pending {
            self.tip_pending = false;
            if self.entries.last() != Some(current) {
                self.entries.push(current.clone());
                self.cursor = self.entries.len() - 1;
                self.enforce_limit();
            }
        }

        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    /// Steps forward one entry, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<GridData> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor).cloned()
    }

    fn enforce_limit(&mut self) {
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
            self.cursor = self.cursor.saturating_sub(excess);
        }
    }
}
