use crate::application::{App, AppMode, SaveStatus};
use crate::domain::{col_to_letter, get_cell_id, CellPosition, CellValue, FormulaEvaluator};
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

/// Width of the row-number column.
pub const ROW_HEADER_WIDTH: u16 = 5;
const COLUMN_SPACING: u16 = 1;

/// Header line, grid and status bar, top to bottom.
fn split_screen(area: Rect) -> [Rect; 3] {
    Layout::vertical([Constraint::Length(1), Constraint::Min(0), Constraint::Length(3)]).areas(area)
}

/// Rows and columns of cells that fit the grid area of a `frame_area`-sized screen.
pub fn viewport_capacity(frame_area: Rect, column_width: u16) -> (usize, usize) {
    let grid = split_screen(frame_area)[1];
    // Borders plus the column header row.
    let rows = grid.height.saturating_sub(3) as usize;
    let usable = grid.width.saturating_sub(2 + ROW_HEADER_WIDTH);
    let cols = (usable / (column_width + COLUMN_SPACING)) as usize;
    (rows.max(1), cols.max(1))
}

/// Hit-tests a screen coordinate against the rendered grid.
pub fn cell_at(app: &App, frame_area: Rect, x: u16, y: u16) -> Option<CellPosition> {
    let grid = split_screen(frame_area)[1];
    let first_row_y = grid.y + 2;
    let first_col_x = grid.x + 1 + ROW_HEADER_WIDTH + COLUMN_SPACING;
    let bottom = grid.y + grid.height.saturating_sub(1);
    let right = grid.x + grid.width.saturating_sub(1);
    if y < first_row_y || y >= bottom || x < first_col_x || x >= right {
        return None;
    }

    let row = app.scroll_row + (y - first_row_y) as usize;
    let col = app.scroll_col + ((x - first_col_x) / (app.column_width + COLUMN_SPACING)) as usize;
    let pos = CellPosition::new(row, col);
    app.dims.contains(pos).then_some(pos)
}

pub fn render_ui(f: &mut Frame, app: &App) {
    let [header, grid, status] = split_screen(f.area());

    render_header(f, app, header);
    render_grid(f, app, grid);
    render_status_bar(f, app, status);

    if app.mode == AppMode::Help {
        render_help_popup(f, app.help_scroll);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let status_style = match app.save_status {
        SaveStatus::Clean | SaveStatus::Saved => Style::default().fg(Color::Green),
        SaveStatus::Pending => Style::default().fg(Color::Yellow),
        SaveStatus::Error(_) => Style::default().fg(Color::Red),
    };
    let line = Line::from(vec![
        Span::raw(format!("cellgrid | {} | {} | ", app.grid_id, app.selection.label())),
        Span::styled(app.save_status.to_string(), status_style),
    ]);
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::Cyan)), area);
}

fn render_grid(f: &mut Frame, app: &App, area: Rect) {
    let (visible_rows, visible_cols) = viewport_capacity(f.area(), app.column_width);
    let last_row = (app.scroll_row + visible_rows).min(app.dims.rows);
    let last_col = (app.scroll_col + visible_cols).min(app.dims.cols);
    let active = app.selection.active();
    let evaluator = FormulaEvaluator::new(&app.store, app.dims);

    let header_style = |selected: bool| {
        if selected {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        }
    };

    let mut headers = vec![Cell::from("")];
    for col in app.scroll_col..last_col {
        let label = Line::from(col_to_letter(col)).alignment(Alignment::Center);
        headers.push(Cell::from(label).style(header_style(col == active.col)));
    }
    let mut rows = vec![Row::new(headers).height(1)];

    for row in app.scroll_row..last_row {
        let mut cells = vec![Cell::from(format!("{}", row + 1)).style(header_style(row == active.row))];

        for col in app.scroll_col..last_col {
            let pos = CellPosition::new(row, col);
            let value = evaluator.value_at(pos);
            let text = match &value {
                CellValue::Number(_) => Line::from(value.to_string()).alignment(Alignment::Right),
                _ => Line::from(value.to_string()),
            };

            let mut style = if pos == active {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else if app.selection.is_selected(pos) {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            if value.is_error() {
                style = style.fg(Color::Red);
            }
            if pos == active && app.selection.is_editing() {
                style = style.add_modifier(Modifier::UNDERLINED);
            }

            cells.push(Cell::from(text).style(style));
        }

        rows.push(Row::new(cells).height(1));
    }

    let mut widths = vec![Constraint::Length(ROW_HEADER_WIDTH)];
    widths.extend((app.scroll_col..last_col).map(|_| Constraint::Length(app.column_width)));

    let title = format!("{} ({}x{})", app.grid_id, app.dims.rows, app.dims.cols);
    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(COLUMN_SPACING)
        .flex(Flex::Start);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    if let Some(session) = app.selection.edit_session() {
        let prefix = format!("{}: ", get_cell_id(session.target));
        let input = Paragraph::new(format!("{prefix}{}", session.buffer))
            .block(Block::default().borders(Borders::ALL).title("Editing (Enter to commit, Esc to cancel)"))
            .style(Style::default().fg(Color::Green));
        f.render_widget(input, area);

        let x = area.x + 1 + (prefix.chars().count() + session.cursor) as u16;
        f.set_cursor_position(Position::new(x.min(area.right().saturating_sub(2)), area.y + 1));
        return;
    }

    let text = match app.mode {
        AppMode::Normal => match &app.status_message {
            Some(status) => status.clone(),
            None => "Enter: edit | Ctrl+C/X/V: copy/cut/paste | Ctrl+Z/Y: undo/redo | Ctrl+S: save | Ctrl+E/L: CSV | F1/?: help | q: quit"
                .to_string(),
        },
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
        AppMode::ExportCsv => format!("Export CSV as: {} (Enter to export, Esc to cancel)", app.filename_input),
        AppMode::ImportCsv => format!("Import CSV from: {} (Enter to import, Esc to cancel)", app.filename_input),
    };

    let style = match app.mode {
        AppMode::Normal => Style::default(),
        AppMode::Help => Style::default().fg(Color::Cyan),
        AppMode::ExportCsv => Style::default().fg(Color::Magenta),
        AppMode::ImportCsv => Style::default().fg(Color::Green),
    };

    let status = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(style);
    f.render_widget(status, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let help_lines: Vec<&str> = HELP_TEXT.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let help_widget = Paragraph::new(help_lines[start_line..end_line].join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("cellgrid Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

const HELP_TEXT: &str = r#"CELLGRID REFERENCE

=== VALUES ===
• Text that parses as a number is a number (42, 3.14, -5.5)
• Anything else is shown as typed
• Text starting with = is a formula

=== FORMULAS ===
Cell references use column letters + row number (A1, B2, AA10)
+ - * /         Arithmetic with parentheses     =(A1+B1)*2
SUM(A1:B3)      Total of numeric cells
AVERAGE(A1:B3)  Mean of numeric cells (0 if none)
COUNT(A1:B3)    Number of numeric cells
MAX(A1:B3)      Largest numeric cell (0 if none)
MIN(A1:B3)      Smallest numeric cell (0 if none)
Results are rounded to 4 decimal places.
Empty cells count as 0 when referenced directly.

=== ERRORS ===
#REF!           Bad address, out-of-grid range, or circular reference
#NAME?          Unsupported function or non-numeric value in arithmetic
#ERROR!         Division by zero or malformed arithmetic

=== SELECTION ===
Arrow keys/hjkl Move the active cell
Shift+arrows    Extend the selection
Mouse drag      Select a range (Shift+click extends)
Ctrl+A          Select the whole grid

=== EDITING ===
Enter/F2        Edit active cell
Enter           Commit and move down
Esc             Cancel the edit
Delete/Bksp     Clear the selection
Ctrl+C/X/V      Copy/cut/paste (tab-separated raw values)
Ctrl+Z/Ctrl+Y   Undo/redo
Ctrl+R/Ctrl+T   Add a row/column

=== FILES ===
Ctrl+S          Save now (changes also save after a short pause)
Ctrl+E          Export the whole grid to CSV
Ctrl+L          Import a .csv file (replaces the grid, undoable)

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window

q               Quit"#;
