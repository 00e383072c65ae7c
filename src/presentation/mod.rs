//! Presentation layer handling terminal UI and user input.
//!
//! Renders the grid with ratatui and maps crossterm key and mouse events
//! onto application operations.

pub mod ui;
pub mod input;

pub use ui::*;
pub use input::*;
