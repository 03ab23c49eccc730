//! The trusted built-in commands.

use std::sync::Arc;

use crate::{Extension, ExtensionIdentity, Kind, LoadedExtension};

/// Prefix of every built-in qualified name.
pub const BUILTIN_PREFIX: &str = "builtin";

const BUILTINS: &[(&str, &str)] = &[
    ("manifest", "Write a manifest of the project's public extensions"),
    ("list", "List discovered extensions"),
    ("info", "Show details about one extension"),
    ("check", "Screen scripts and show how the extension base resolves in them"),
];

/// A command shipped with weft. Each has its own subcommand and no pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builtin {
    name: &'static str,
    description: &'static str,
}

impl Extension for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> Option<&str> {
        Some(self.description)
    }

    fn private(&self) -> bool {
        true
    }
}

/// Built-in identities, exempt from screening.
pub fn builtins() -> Vec<LoadedExtension> {
    BUILTINS
        .iter()
        .map(|&(name, description)| {
            LoadedExtension::new(
                ExtensionIdentity::new(
                    format!("{}.{}", BUILTIN_PREFIX, name),
                    concat!("<", env!("CARGO_PKG_NAME"), ">"),
                    Kind::Builtin,
                ),
                Arc::new(Builtin { name, description }),
            )
        })
        .collect()
}
