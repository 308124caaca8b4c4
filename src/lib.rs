// Clippy allows for reasonable defaults
// These suppress warnings where the suggested change doesn't improve readability
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::field_reassign_with_default)] // Builder pattern is clearer
#![allow(clippy::redundant_closure)] // |x| f(x) can be clearer than f
#![allow(clippy::unwrap_or_default)] // unwrap_or_else(Default::default) can be clearer

// Module declarations
pub mod auth;
pub mod config;
pub mod error;
pub mod file_storage;
pub mod models;
pub mod server;
pub mod shutdown;
pub mod survey;
pub mod utils;

// Re-export models for use by the binary and integration tests
pub use error::{AppError, AppResult, ErrorCode};
pub use models::*;
