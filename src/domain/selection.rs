//! Selection and interaction state machine.
//!
//! [`SelectionState`] is what is highlighted; [`Interaction`] is what the
//! user is currently doing (nothing, editing a cell, or dragging out a
//! range). Both live in [`SelectionModel`], which event handlers receive by
//! mutable reference.

use super::address::{CellPosition, Range, get_cell_id};
use super::models::GridDimensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub active: CellPosition,
    pub range: Option<Range>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            active: CellPosition::new(0, 0),
            range: None,
        }
    }
}

/// In-progress cell edit. `cursor` counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target: CellPosition,
    pub buffer: String,
    pub cursor: usize,
}

impl EditSession {
    pub fn new(target: CellPosition, initial: &str) -> Self {
        Self {
            target,
            buffer: initial.to_string(),
            cursor: initial.chars().count(),
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.buffer.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.buffer.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Editing(EditSession),
    Dragging { anchor: CellPosition },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    pub state: SelectionState,
    pub interaction: Interaction,
}

impl SelectionModel {
    pub fn active(&self) -> CellPosition {
        self.state.active
    }

    pub fn range(&self) -> Option<Range> {
        self.state.range
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.interaction, Interaction::Editing(_))
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        match &self.interaction {
            Interaction::Editing(session) => Some(session),
            _ => None,
        }
    }

    pub fn edit_session_mut(&mut self) -> Option<&mut EditSession> {
        match &mut self.interaction {
            Interaction::Editing(session) => Some(session),
            _ => None,
        }
    }

    /// The cells an operation like copy or delete should act on.
    pub fn target_range(&self) -> Range {
        self.state.range.unwrap_or_else(|| Range::single(self.state.active))
    }

    /// `"start:end"` when a range exists, otherwise the active cell id.
    pub fn label(&self) -> String {
        match self.state.range {
            Some(range) => range.to_string(),
            None => get_cell_id(self.state.active),
        }
    }

    pub fn is_selected(&self, pos: CellPosition) -> bool {
        self.state.range.is_some_and(|range| range.contains(pos))
    }

    pub fn pointer_down(&mut self, pos: CellPosition, shift: bool) {
        if shift {
            let anchor = self.state.range.map(|r| r.start).unwrap_or(self.state.active);
            self.state.range = Some(Range::new(anchor, pos));
            self.state.active = pos;
            return;
        }

        self.state.active = pos;
        self.state.range = Some(Range::single(pos));
        self.interaction = Interaction::Dragging { anchor: pos };
    }

    pub fn pointer_move(&mut self, pos: CellPosition) {
        if let Interaction::Dragging { anchor } = self.interaction {
            self.state.range = Some(Range::new(anchor, pos));
        }
    }

    pub fn pointer_up(&mut self) {
        if matches!(self.interaction, Interaction::Dragging { .. }) {
            self.interaction = Interaction::Idle;
        }
    }

    /// Moves the active cell one step, clamped to the grid.
    pub fn arrow(&mut self, direction: Direction, shift: bool, dims: GridDimensions) {
        let from = self.state.active;
        let to = step(from, direction, dims);

        if shift {
            let anchor = self.state.range.map(|r| r.start).unwrap_or(from);
            self.state.range = Some(Range::new(anchor, to));
        } else {
            self.state.range = None;
        }
        self.state.active = to;
    }

    pub fn select_all(&mut self, dims: GridDimensions) {
        self.state.range = Some(Range::new(CellPosition::new(0, 0), dims.last()));
    }

    /// Replaces the selection with `range`, making its start active.
    pub fn select_range(&mut self, range: Range) {
        self.state.active = range.start;
        self.state.range = Some(range);
    }

    pub fn begin_edit(&mut self, initial: &str) {
        let target = self.state.active;
        self.state.range = None;
        self.interaction = Interaction::Editing(EditSession::new(target, initial));
    }

    /// Escape: drops any in-progress edit. The selection is untouched.
    pub fn cancel_edit(&mut self) {
        if self.is_editing() {
            self.interaction = Interaction::Idle;
        }
    }

    /// Ends the edit and returns what should be written where.
    pub fn finish_edit(&mut self) -> Option<EditSession> {
        match std::mem::take(&mut self.interaction) {
            Interaction::Editing(session) => Some(session),
            other => {
                self.interaction = other;
                None
            }
        }
    }

    /// Keeps the selection addressable after the grid changes.
    pub fn clamp_to(&mut self, dims: GridDimensions) {
        self.state.active = dims.clamp(self.state.active);
        if let Some(range) = self.state.range {
            self.state.range = Some(Range::new(dims.clamp(range.start), dims.clamp(range.end)));
        }
    }
}

fn step(pos: CellPosition, direction: Direction, dims: GridDimensions) -> CellPosition {
    let moved = match direction {
        Direction::Up => CellPosition::new(pos.row.saturating_sub(1), pos.col),
        Direction::Down => CellPosition::new(pos.row + 1, pos.col),
        Direction::Left => CellPosition::new(pos.row, pos.col.saturating_sub(1)),
        Direction::Right => CellPosition::new(pos.row, pos.col + 1),
    };
    dims.clamp(moved)
}
