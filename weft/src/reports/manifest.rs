//! Manifest command report data structures.

use std::path::PathBuf;

use weft_core::plural;

use super::output::{Output, Report};

/// Report data from writing a manifest.
#[derive(Debug)]
pub struct ManifestReport {
    /// Where the manifest was written.
    pub path: PathBuf,
    /// Exported names and paths.
    pub entries: Vec<(String, PathBuf)>,
}

impl Report for ManifestReport {
    fn render(&self, out: &mut dyn Output) {
        if self.entries.is_empty() {
            out.warning("no public extensions to export");
        }
        for (name, path) in &self.entries {
            out.created(&format!("{} = {}", name, path.display()));
        }
        out.block(&format!(
            "✓ {} exported to {}",
            plural(self.entries.len(), "extension"),
            self.path.display()
        ));
    }
}
