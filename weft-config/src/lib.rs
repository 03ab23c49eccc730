//! Parsing and validation of `weft.toml` project files.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod config;
mod error;
mod file;
mod validate;

pub use config::{Config, ExtensionsConfig, ProjectConfig, WeftConfig};
pub use error::{Error, Result, SourceContext};
pub use file::{CONFIG_FILE, WeftToml};
