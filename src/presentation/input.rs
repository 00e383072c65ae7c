use crate::application::{App, AppMode};
use crate::domain::Direction;
use crate::presentation::ui::cell_at;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if app.selection.is_editing() {
            Self::handle_editing_mode(app, key, modifiers);
            return;
        }

        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::ExportCsv | AppMode::ImportCsv => Self::handle_filename_input_mode(app, key),
        }
    }

    /// `q` only quits from plain grid navigation.
    pub fn should_quit(app: &App, key: KeyCode, modifiers: KeyModifiers) -> bool {
        key == KeyCode::Char('q')
            && !modifiers.contains(KeyModifiers::CONTROL)
            && app.mode == AppMode::Normal
            && !app.selection.is_editing()
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('c') => {
                    app.copy();
                }
                KeyCode::Char('x') => {
                    app.cut();
                }
                KeyCode::Char('v') => {
                    app.paste();
                }
                KeyCode::Char('z') => app.undo(),
                KeyCode::Char('y') => app.redo(),
                KeyCode::Char('s') => app.force_save(),
                KeyCode::Char('e') => app.start_csv_export(),
                KeyCode::Char('l') => app.start_csv_import(),
                KeyCode::Char('r') => app.add_row(),
                KeyCode::Char('t') => app.add_col(),
                KeyCode::Char('a') => app.select_all(),
                _ => {}
            }
            return;
        }

        let is_shift = modifiers.contains(KeyModifiers::SHIFT);
        app.status_message = None;

        match key {
            KeyCode::Up | KeyCode::Char('k') => app.move_selection(Direction::Up, is_shift),
            KeyCode::Down | KeyCode::Char('j') => app.move_selection(Direction::Down, is_shift),
            KeyCode::Left | KeyCode::Char('h') => app.move_selection(Direction::Left, is_shift),
            KeyCode::Right | KeyCode::Char('l') => app.move_selection(Direction::Right, is_shift),
            // Terminals report Shift+h as an uppercase letter.
            KeyCode::Char('K') => app.move_selection(Direction::Up, true),
            KeyCode::Char('J') => app.move_selection(Direction::Down, true),
            KeyCode::Char('H') => app.move_selection(Direction::Left, true),
            KeyCode::Char('L') => app.move_selection(Direction::Right, true),
            KeyCode::Enter | KeyCode::F(2) => app.start_editing(),
            KeyCode::Delete | KeyCode::Backspace => {
                app.delete_selection();
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.mode = AppMode::Help;
                app.help_scroll = 0;
            }
            KeyCode::Esc => app.cancel_editing(),
            _ => {}
        }
    }

    fn handle_editing_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        // Grid shortcuts do not apply inside the edit buffer.
        if modifiers.contains(KeyModifiers::CONTROL) {
            return;
        }

        match key {
            KeyCode::Enter => app.finish_editing(),
            KeyCode::Esc => app.cancel_editing(),
            KeyCode::Backspace => app.edit_backspace(),
            KeyCode::Delete => app.edit_delete(),
            KeyCode::Left => app.edit_move_left(),
            KeyCode::Right => app.edit_move_right(),
            KeyCode::Home => app.edit_move_home(),
            KeyCode::End => app.edit_move_end(),
            KeyCode::Char(c) => app.edit_insert(c),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_filename_input_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.confirm_filename_input(),
            KeyCode::Esc => app.cancel_filename_input(),
            KeyCode::Backspace => app.filename_backspace(),
            KeyCode::Delete => app.filename_delete(),
            KeyCode::Left => app.filename_move(-1),
            KeyCode::Right => app.filename_move(1),
            KeyCode::Home => app.filename_move_to(false),
            KeyCode::End => app.filename_move_to(true),
            KeyCode::Char(c) => app.filename_insert(c),
            _ => {}
        }
    }

    /// Maps left-button gestures onto the selection. `frame_area` is the
    /// full terminal area the grid was last drawn into.
    pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, frame_area: Rect) {
        if app.mode != AppMode::Normal {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(pos) = cell_at(app, frame_area, mouse.column, mouse.row) {
                    let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
                    app.pointer_down(pos, shift);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(pos) = cell_at(app, frame_area, mouse.column, mouse.row) {
                    app.pointer_move(pos);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
            MouseEventKind::ScrollDown => app.move_selection(Direction::Down, false),
            MouseEventKind::ScrollUp => app.move_selection(Direction::Up, false),
            _ => {}
        }
    }
}
