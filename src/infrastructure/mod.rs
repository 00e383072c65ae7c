//! Infrastructure layer providing external service integrations.
//!
//! Persistence of whole grids, the host clipboard, CSV files on disk and
//! user settings live here, behind small traits the application layer
//! depends on.

pub mod clipboard;
pub mod config;
pub mod files;
pub mod persistence;

pub use clipboard::*;
pub use config::*;
pub use files::*;
pub use persistence::*;
