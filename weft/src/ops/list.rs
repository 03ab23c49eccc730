//! List operation - discovered extensions.

use weft_loader::{Extensions, Kind};

use crate::reports::{ListEntry, ListReport};

/// Execute the list operation.
pub fn list(extensions: &Extensions, all: bool) -> ListReport {
    let entries = extensions
        .iter()
        .filter(|loaded| all || loaded.kind() != Kind::Builtin)
        .map(|loaded| ListEntry {
            name: loaded.qualified_name().to_string(),
            kind: loaded.kind(),
            description: loaded
                .extension
                .description()
                .and_then(|text| text.lines().next())
                .map(str::to_string),
        })
        .collect();

    ListReport { entries }
}
