pub mod address;
pub mod errors;
pub mod history;
pub mod interchange;
pub mod models;
pub mod parser;
pub mod selection;
pub mod services;

pub use address::*;
pub use errors::*;
pub use history::*;
pub use interchange::*;
pub use models::*;
pub use selection::*;
pub use services::*;
