//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer,
//! owning the view state, the undo history and the debounced save.

pub mod debounce;
pub mod state;

pub use debounce::*;
pub use state::*;
