//! cellgrid - Terminal Grid
//!
//! A small terminal spreadsheet: sparse cells, formulas with range
//! functions, multi-cell selection, undo/redo, clipboard and CSV
//! interchange, and a debounced save of the whole grid.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cellgrid::application::{App, AppOptions};
use cellgrid::infrastructure::{ClipboardPort, FileRepository, MemoryClipboard, Settings, SystemClipboard};
use cellgrid::presentation::{render_ui, viewport_capacity, InputHandler};

/// Longest the loop blocks on input when no save is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "cellgrid")]
#[command(about = "Terminal grid with formulas, undo and CSV interchange")]
#[command(version)]
struct Args {
    /// Grid to open; created on first save
    #[arg(default_value = "default")]
    grid_id: String,

    /// Directory holding saved grids
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Rows of a new grid
    #[arg(long)]
    rows: Option<usize>,

    /// Columns of a new grid
    #[arg(long)]
    cols: Option<usize>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Save pending changes on quit instead of discarding them
    #[arg(long)]
    flush_on_exit: bool,
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(rows) = self.rows {
            settings.default_rows = rows;
        }
        if let Some(cols) = self.cols {
            settings.default_cols = cols;
        }
        if let Some(path) = &self.log_file {
            settings.log_file = path.clone();
        }
        if self.flush_on_exit {
            settings.flush_on_exit = true;
        }
    }
}

fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("CELLGRID_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn open_clipboard() -> Box<dyn ClipboardPort> {
    match SystemClipboard::open() {
        Ok(clipboard) => Box::new(clipboard),
        Err(e) => {
            warn!(error = %e, "system clipboard unavailable, using an in-process clipboard");
            Box::new(MemoryClipboard::new())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let (mut settings, settings_error) = match Settings::load() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    args.apply_to(&mut settings);

    if let Err(e) = init_logging(&settings.log_file) {
        eprintln!("cellgrid: logging disabled ({}): {e}", settings.log_file.display());
    }
    if let Some(e) = settings_error {
        warn!(error = %e, "ignoring settings file, using defaults");
    }
    info!(grid = %args.grid_id, data_dir = %settings.data_dir.display(), "starting");

    let options = AppOptions::from_settings(&args.grid_id, &settings);
    let gateway = Box::new(FileRepository::new(settings.data_dir.clone()));
    let mut app = App::open(options, gateway, open_clipboard());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Dropping the app cancels or flushes the pending save.
    drop(app);
    info!("exiting");

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Main event loop. Blocks on input for at most the time left before the
/// debounced save is due, then lets the app fire it.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        let (rows, cols) = viewport_capacity(area, app.column_width);
        app.update_viewport_size(rows, cols);

        terminal.draw(|f| render_ui(f, app))?;

        let timeout = app.next_save_in(Instant::now()).map_or(IDLE_POLL, |left| left.min(IDLE_POLL));
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if InputHandler::should_quit(app, key.code, key.modifiers) {
                        return Ok(());
                    }
                    InputHandler::handle_key_event(app, key.code, key.modifiers);
                }
                Event::Mouse(mouse) => InputHandler::handle_mouse_event(app, mouse, area),
                _ => {}
            }
        }

        app.tick(Instant::now());
    }
}
