//! Shared types and helpers for the Course Platform
//!
//! This crate contains types shared between the backend, the browser (via
//! WASM), and tests: domain enums, request/response payloads of the public
//! functions, validation rules and the media upload signature.

pub mod models;
pub mod signing;
pub mod types;
pub mod validation;

pub use models::*;
pub use signing::*;
pub use types::*;
pub use validation::*;
