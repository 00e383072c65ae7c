//! cellgrid - Terminal Grid Library
//!
//! A small spreadsheet engine (sparse cell store, formula evaluation with
//! range functions and cycle detection, selection model, snapshot undo/redo,
//! clipboard and CSV interchange) with a terminal front end.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
