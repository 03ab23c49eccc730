//! Info command report data structures.

use std::path::PathBuf;

use weft_loader::Kind;

use super::output::{Output, Report};

/// Report data about one extension.
#[derive(Debug)]
pub struct InfoReport {
    /// Qualified name.
    pub name: String,
    pub kind: Kind,
    /// Script the extension was loaded from.
    pub path: PathBuf,
    pub description: Option<String>,
    /// The extension's settings table, rendered inline.
    pub settings: Option<String>,
    /// Pipelines per ingest key.
    pub pipelines: Vec<(Option<String>, String)>,
}

impl Report for InfoReport {
    fn render(&self, out: &mut dyn Output) {
        out.heading(&self.name);
        if let Some(description) = &self.description {
            out.block(description);
        }
        out.blank();

        out.field("Kind", self.kind.as_str());
        out.field("Source", &self.path.display().to_string());
        if let Some(settings) = &self.settings {
            out.field("Settings", settings);
        }

        if !self.pipelines.is_empty() {
            out.blank();
            out.group("Pipelines");
            for (key, pipeline) in &self.pipelines {
                match key {
                    Some(key) => out.entry(&format!("{}: {}", key, pipeline)),
                    None => out.entry(pipeline),
                }
            }
        }
    }
}
