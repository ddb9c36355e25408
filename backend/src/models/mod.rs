//! Domain models shared with the browser build

pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;
