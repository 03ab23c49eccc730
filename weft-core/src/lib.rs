//! Core utilities and types for the weft code generator.
//!
//! This crate provides the small pieces shared by every other weft crate:
//! writing generated files and a few text helpers.

mod file;
mod utils;

// File operations
pub use file::{Content, File, WriteResult};
// Text utilities
pub use utils::{dedent, plural};
