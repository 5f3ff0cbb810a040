//! Shared types for the database layer.

pub mod errors;

pub use errors::{ChatError, ChatResult};
