//! Application state management for the terminal grid.
//!
//! [`App`] owns the cell store, selection, history and the debounced save,
//! and exposes one method per user gesture. Every method that changes
//! cell content records the prior state in history first and reschedules
//! the save.

use crate::application::debounce::SaveScheduler;
use crate::domain::{
    deserialize_and_paste, serialize_range, CellId, CellPosition, CellStore, CsvImport, Direction,
    FormulaEvaluator, GridData, GridDimensions, HistoryStack, SelectionModel,
};
use crate::infrastructure::{
    export_csv_file, import_csv_file, sanitize_grid_id, ClipboardPort, GridSnapshot, MemoryClipboard,
    MemoryRepository, PersistenceGateway, Settings,
};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Overlay shown on top of the grid.
///
/// Cell editing is not a mode here; it lives in the selection's
/// interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Grid navigation, shortcuts available
    Normal,
    /// Help screen is displayed
    Help,
    /// CSV export filename prompt
    ExportCsv,
    /// CSV import filename prompt
    ImportCsv,
}

/// Observable outcome of the persistence path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing changed since load
    Clean,
    /// A save is scheduled
    Pending,
    Saved,
    Error(String),
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Clean => write!(f, "clean"),
            SaveStatus::Pending => write!(f, "unsaved"),
            SaveStatus::Saved => write!(f, "saved"),
            SaveStatus::Error(message) => write!(f, "save error: {message}"),
        }
    }
}

/// Construction parameters for [`App`].
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub grid_id: String,
    /// Dimensions of a grid that has never been saved
    pub dims: GridDimensions,
    pub column_width: u16,
    pub save_delay: Duration,
    pub history_limit: usize,
    pub flush_on_exit: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings("default", &Settings::default())
    }
}

impl AppOptions {
    pub fn from_settings(grid_id: &str, settings: &Settings) -> Self {
        Self {
            grid_id: grid_id.to_string(),
            dims: GridDimensions::new(settings.default_rows, settings.default_cols),
            column_width: settings.column_width.max(3),
            save_delay: settings.save_debounce(),
            history_limit: settings.history_limit,
            flush_on_exit: settings.flush_on_exit,
        }
    }
}

/// Main application state containing the grid and UI state.
///
/// # Examples
///
/// ```
/// use cellgrid::application::App;
/// use cellgrid::domain::CellPosition;
///
/// let mut app = App::default();
/// app.start_editing();
/// for c in "=2*21".chars() {
///     app.edit_insert(c);
/// }
/// app.finish_editing();
///
/// assert_eq!(app.display_value(CellPosition::new(0, 0)), "42");
/// assert_eq!(app.selection.active(), CellPosition::new(1, 0));
/// ```
pub struct App {
    pub grid_id: String,
    pub store: CellStore,
    pub dims: GridDimensions,
    pub selection: SelectionModel,
    pub history: HistoryStack,
    pub mode: AppMode,
    /// Temporary status message to display
    pub status_message: Option<String>,
    pub save_status: SaveStatus,
    /// Top-left row visible in the viewport
    pub scroll_row: usize,
    /// Left-most column visible in the viewport
    pub scroll_col: usize,
    pub viewport_rows: usize,
    pub viewport_cols: usize,
    pub column_width: u16,
    /// Input buffer for filename prompts
    pub filename_input: String,
    /// Cursor within `filename_input`, in characters
    pub cursor_position: usize,
    /// Scroll position in help text
    pub help_scroll: usize,
    flush_on_exit: bool,
    scheduler: SaveScheduler,
    gateway: Box<dyn PersistenceGateway>,
    clipboard: Box<dyn ClipboardPort>,
}

impl Default for App {
    fn default() -> Self {
        Self::open(
            AppOptions::default(),
            Box::new(MemoryRepository::new()),
            Box::new(MemoryClipboard::new()),
        )
    }
}

impl App {
    /// Loads the grid once from `gateway` and builds the view around it.
    ///
    /// A missing grid starts empty at the configured dimensions. A failed
    /// load also starts empty and reports the failure in the status line.
    pub fn open(
        options: AppOptions,
        gateway: Box<dyn PersistenceGateway>,
        clipboard: Box<dyn ClipboardPort>,
    ) -> Self {
        let mut status_message = None;
        let (data, dims) = match gateway.load(&options.grid_id) {
            Ok(Some(snapshot)) => {
                let dims = snapshot.dimensions();
                info!(grid = %options.grid_id, cells = snapshot.grid_data.len(), "loaded grid");
                (snapshot.grid_data, dims)
            }
            Ok(None) => {
                info!(grid = %options.grid_id, "starting new grid");
                (GridData::new(), options.dims)
            }
            Err(e) => {
                error!(grid = %options.grid_id, error = %e, "failed to load grid");
                status_message = Some(format!("Load failed: {e}"));
                (GridData::new(), options.dims)
            }
        };

        Self {
            grid_id: options.grid_id,
            store: CellStore::new(data),
            dims,
            selection: SelectionModel::default(),
            history: HistoryStack::with_limit(options.history_limit),
            mode: AppMode::Normal,
            status_message,
            save_status: SaveStatus::Clean,
            scroll_row: 0,
            scroll_col: 0,
            viewport_rows: 20,
            viewport_cols: 8,
            column_width: options.column_width,
            filename_input: String::new(),
            cursor_position: 0,
            help_scroll: 0,
            flush_on_exit: options.flush_on_exit,
            scheduler: SaveScheduler::new(options.save_delay),
            gateway,
            clipboard,
        }
    }

    pub fn clipboard_mut(&mut self) -> &mut dyn ClipboardPort {
        self.clipboard.as_mut()
    }

    /// Evaluated text for one cell, recomputed on every call.
    pub fn display_value(&self, pos: CellPosition) -> String {
        FormulaEvaluator::new(&self.store, self.dims).display_value(pos)
    }

    pub fn raw_value(&self, pos: CellPosition) -> &str {
        self.store.get_at(pos).unwrap_or("")
    }

    /// Runs `mutate` against the store. When content changed, the prior
    /// state goes into history and a save is scheduled.
    fn apply<F>(&mut self, mutate: F) -> bool
    where
        F: FnOnce(&mut CellStore, GridDimensions),
    {
        let before = self.store.snapshot();
        mutate(&mut self.store, self.dims);
        if *self.store.data() == before {
            return false;
        }
        self.history.push(before);
        self.mark_dirty();
        true
    }

    fn mark_dirty(&mut self) {
        self.scheduler.schedule(Instant::now());
        self.save_status = SaveStatus::Pending;
        debug!(grid = %self.grid_id, delay_ms = self.scheduler.delay().as_millis() as u64, "save scheduled");
    }

    // Editing

    /// Enters edit mode on the active cell, seeded with its raw value.
    pub fn start_editing(&mut self) {
        let raw = self.raw_value(self.selection.active()).to_string();
        self.selection.begin_edit(&raw);
        self.status_message = None;
    }

    pub fn edit_insert(&mut self, c: char) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.insert(c);
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.backspace();
        }
    }

    pub fn edit_delete(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.delete();
        }
    }

    pub fn edit_move_left(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.move_left();
        }
    }

    pub fn edit_move_right(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.move_right();
        }
    }

    pub fn edit_move_home(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.move_home();
        }
    }

    pub fn edit_move_end(&mut self) {
        if let Some(session) = self.selection.edit_session_mut() {
            session.move_end();
        }
    }

    /// Writes the edit buffer to its cell. Returns false when not editing.
    fn commit_edit(&mut self) -> bool {
        let Some(session) = self.selection.finish_edit() else {
            return false;
        };
        let id = CellId::from(session.target);
        let buffer = session.buffer;
        self.apply(|store, _| store.set(id, &buffer));
        true
    }

    /// Commits the edit and moves the active cell one row down.
    pub fn finish_editing(&mut self) {
        if self.commit_edit() {
            self.selection.arrow(Direction::Down, false, self.dims);
            self.ensure_cursor_visible();
        }
    }

    /// Drops the edit buffer. The selection is left as it was.
    pub fn cancel_editing(&mut self) {
        self.selection.cancel_edit();
    }

    // Selection

    pub fn move_selection(&mut self, direction: Direction, extend: bool) {
        self.selection.arrow(direction, extend, self.dims);
        self.ensure_cursor_visible();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(self.dims);
    }

    /// Pointer pressed on a cell. An in-progress edit is committed first.
    pub fn pointer_down(&mut self, pos: CellPosition, shift: bool) {
        self.commit_edit();
        self.selection.pointer_down(self.dims.clamp(pos), shift);
        self.status_message = None;
    }

    pub fn pointer_move(&mut self, pos: CellPosition) {
        self.selection.pointer_move(self.dims.clamp(pos));
    }

    pub fn pointer_up(&mut self) {
        self.selection.pointer_up();
    }

    // Content operations

    /// Deletes every cell of the selection (or the active cell).
    pub fn delete_selection(&mut self) -> bool {
        let range = self.selection.target_range();
        let changed = self.apply(|store, _| {
            for pos in range.bounds().positions() {
                store.delete(CellId::from(pos));
            }
        });
        if changed {
            self.status_message = Some(format!("Deleted {range}"));
        }
        changed
    }

    /// Copies the raw values of the selection to the clipboard.
    pub fn copy(&mut self) -> bool {
        let range = self.selection.target_range();
        let text = serialize_range(range, &self.store);
        match self.clipboard.write_text(&text) {
            Ok(()) => {
                self.status_message = Some(format!("Copied {}", self.selection.label()));
                true
            }
            Err(e) => {
                warn!(error = %e, "copy failed");
                self.status_message = Some(format!("Copy failed: {e}"));
                false
            }
        }
    }

    /// Copy followed by delete. Nothing is deleted if the copy fails.
    pub fn cut(&mut self) -> bool {
        if !self.copy() {
            return false;
        }
        let label = self.selection.label();
        self.delete_selection();
        self.status_message = Some(format!("Cut {label}"));
        true
    }

    /// Pastes clipboard text at the active cell and selects what landed.
    pub fn paste(&mut self) -> bool {
        let text = match self.clipboard.read_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "paste failed");
                self.status_message = Some(format!("Paste failed: {e}"));
                return false;
            }
        };

        let origin = self.selection.active();
        let mut pasted = None;
        self.apply(|store, dims| pasted = deserialize_and_paste(&text, origin, store, dims));

        match pasted {
            Some(range) => {
                self.selection.select_range(range);
                self.status_message = Some(format!("Pasted into {range}"));
                true
            }
            None => {
                self.status_message = Some("Nothing to paste".to_string());
                false
            }
        }
    }

    pub fn undo(&mut self) {
        match self.history.undo(&self.store.snapshot()) {
            Some(state) => {
                self.store.replace_all(state);
                self.selection.clamp_to(self.dims);
                self.mark_dirty();
                self.status_message = Some("Undo".to_string());
            }
            None => self.status_message = Some("Nothing to undo".to_string()),
        }
    }

    pub fn redo(&mut self) {
        match self.history.redo() {
            Some(state) => {
                self.store.replace_all(state);
                self.selection.clamp_to(self.dims);
                self.mark_dirty();
                self.status_message = Some("Redo".to_string());
            }
            None => self.status_message = Some("Nothing to redo".to_string()),
        }
    }

    pub fn add_row(&mut self) {
        self.dims.add_rows(1);
        self.mark_dirty();
        self.status_message = Some(format!("{} rows", self.dims.rows));
    }

    pub fn add_col(&mut self) {
        self.dims.add_cols(1);
        self.mark_dirty();
        self.status_message = Some(format!("{} columns", self.dims.cols));
    }

    // Persistence

    /// Fires the debounced save once its quiet period has elapsed.
    /// Returns true when a save was attempted.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scheduler.take_due(now) {
            self.save_now();
            true
        } else {
            false
        }
    }

    /// How long the event loop may block before the next [`tick`](Self::tick) matters.
    pub fn next_save_in(&self, now: Instant) -> Option<Duration> {
        self.scheduler.time_until(now)
    }

    /// Saves immediately, dropping any pending debounce.
    pub fn force_save(&mut self) {
        self.scheduler.cancel();
        self.save_now();
        self.status_message = Some(match &self.save_status {
            SaveStatus::Error(message) => format!("Save failed: {message}"),
            _ => format!("Saved {}", self.grid_id),
        });
    }

    /// Sends the whole grid to the gateway. In-memory state is never rolled
    /// back on failure.
    fn save_now(&mut self) {
        let snapshot = GridSnapshot::new(self.store.snapshot(), self.dims);
        match self.gateway.save(&self.grid_id, &snapshot) {
            Ok(()) => {
                info!(grid = %self.grid_id, cells = snapshot.grid_data.len(), "grid saved");
                self.save_status = SaveStatus::Saved;
            }
            Err(e) => {
                error!(grid = %self.grid_id, error = %e, "grid save failed");
                self.save_status = SaveStatus::Error(e.to_string());
            }
        }
    }

    // File prompts

    pub fn start_csv_export(&mut self) {
        self.mode = AppMode::ExportCsv;
        self.filename_input = self.default_export_filename();
        self.cursor_position = self.filename_input.chars().count();
        self.status_message = None;
    }

    pub fn start_csv_import(&mut self) {
        self.mode = AppMode::ImportCsv;
        self.filename_input = "data.csv".to_string();
        self.cursor_position = self.filename_input.chars().count();
        self.status_message = None;
    }

    pub fn cancel_filename_input(&mut self) {
        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    fn default_export_filename(&self) -> String {
        format!("{}.csv", sanitize_grid_id(&self.grid_id))
    }

    /// Runs the export or import the current prompt is for.
    pub fn confirm_filename_input(&mut self) {
        let filename = self.filename_input.trim().to_string();
        match self.mode {
            AppMode::ExportCsv => {
                let filename = if filename.is_empty() { self.default_export_filename() } else { filename };
                self.export_csv_to(Path::new(&filename));
            }
            AppMode::ImportCsv if !filename.is_empty() => {
                self.import_csv_from(Path::new(&filename));
            }
            _ => {}
        }
        self.cancel_filename_input();
    }

    pub fn export_csv_to(&mut self, path: &Path) -> bool {
        match export_csv_file(path, &self.store, self.dims) {
            Ok(()) => {
                self.status_message = Some(format!("Exported to {}", path.display()));
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "csv export failed");
                self.status_message = Some(format!("Export failed: {e}"));
                false
            }
        }
    }

    /// Replaces the grid with a CSV file. On any error the grid is untouched.
    pub fn import_csv_from(&mut self, path: &Path) -> bool {
        match import_csv_file(path) {
            Ok(imported) => {
                self.apply_import(imported);
                self.status_message = Some(format!("Imported {}", path.display()));
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "csv import failed");
                self.status_message = Some(format!("Import failed: {e}"));
                false
            }
        }
    }

    fn apply_import(&mut self, imported: CsvImport) {
        if imported.rows > 0 && imported.cols > 0 {
            self.dims.grow_to_fit(CellPosition::new(imported.rows - 1, imported.cols - 1));
        }
        let data = imported.data;
        if !self.apply(|store, _| store.replace_all(data)) {
            // Same content, but the dimensions may have grown.
            self.mark_dirty();
        }
        self.selection = SelectionModel::default();
        self.scroll_row = 0;
        self.scroll_col = 0;
    }

    pub fn filename_insert(&mut self, c: char) {
        let at = byte_index(&self.filename_input, self.cursor_position);
        self.filename_input.insert(at, c);
        self.cursor_position += 1;
    }

    pub fn filename_backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = byte_index(&self.filename_input, self.cursor_position);
            self.filename_input.remove(at);
        }
    }

    pub fn filename_delete(&mut self) {
        if self.cursor_position < self.filename_input.chars().count() {
            let at = byte_index(&self.filename_input, self.cursor_position);
            self.filename_input.remove(at);
        }
    }

    pub fn filename_move(&mut self, delta: isize) {
        let len = self.filename_input.chars().count();
        self.cursor_position = self.cursor_position.saturating_add_signed(delta).min(len);
    }

    pub fn filename_move_to(&mut self, end: bool) {
        self.cursor_position = if end { self.filename_input.chars().count() } else { 0 };
    }

    // Viewport

    /// Updates the viewport size for proper scrolling calculations.
    pub fn update_viewport_size(&mut self, rows: usize, cols: usize) {
        self.viewport_rows = rows.max(1);
        self.viewport_cols = cols.max(1);
        self.ensure_cursor_visible();
    }

    /// Ensures the active cell is visible by adjusting scroll position.
    pub fn ensure_cursor_visible(&mut self) {
        let active = self.selection.active();

        if active.row < self.scroll_row {
            self.scroll_row = active.row;
        } else if active.row >= self.scroll_row + self.viewport_rows {
            self.scroll_row = active.row + 1 - self.viewport_rows;
        }

        if active.col < self.scroll_col {
            self.scroll_col = active.col;
        } else if active.col >= self.scroll_col + self.viewport_cols {
            self.scroll_col = active.col + 1 - self.viewport_cols;
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if self.scheduler.cancel() {
            if self.flush_on_exit {
                self.save_now();
            } else {
                info!(grid = %self.grid_id, "pending save cancelled on exit");
            }
        }
    }
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices().nth(char_index).map(|(i, _)| i).unwrap_or(text.len())
}
