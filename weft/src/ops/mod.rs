//! Core operations.
//!
//! This module contains the business logic for weft commands,
//! separated from CLI argument parsing and output rendering.

pub mod check;
pub mod info;
pub mod list;
pub mod manifest;
pub mod run;

pub use check::check;
pub use info::info;
pub use list::list;
pub use manifest::manifest;
pub use run::run;
