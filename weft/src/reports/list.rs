//! List command report data structures.

use weft_loader::Kind;

use super::output::{Output, Report};

#[derive(Debug)]
pub struct ListEntry {
    pub name: String,
    pub kind: Kind,
    /// First line of the description.
    pub description: Option<String>,
}

/// Report data from listing extensions.
#[derive(Debug)]
pub struct ListReport {
    pub entries: Vec<ListEntry>,
}

impl Report for ListReport {
    fn render(&self, out: &mut dyn Output) {
        if self.entries.is_empty() {
            out.block("No extensions found");
            return;
        }

        let width = self
            .entries
            .iter()
            .map(|entry| entry.name.len())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            let line = format!("{:<width$}  {:<9}", entry.name, entry.kind.as_str());
            match &entry.description {
                Some(description) => out.entry(&format!("{}  {}", line, description)),
                None => out.entry(line.trim_end()),
            }
        }
    }
}
