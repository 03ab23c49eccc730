//! Report data structures for commands.
//!
//! This module provides data structures that separate data collection from rendering.
//! Commands build reports, then render them to an Output target.

mod check;
mod info;
mod list;
mod manifest;
mod output;
mod run;

pub use check::{CheckEntry, CheckReport, Screening};
pub use info::InfoReport;
pub use list::{ListEntry, ListReport};
pub use manifest::ManifestReport;
pub use output::{Report, TerminalOutput};
pub use run::{ExtensionRun, RunReport};

#[cfg(test)]
pub(crate) use output::testing;
