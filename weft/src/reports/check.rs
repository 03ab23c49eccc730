//! Check command report data structures.

use std::path::PathBuf;

use super::output::{Output, Report};

/// Outcome of screening one script.
#[derive(Debug)]
pub enum Screening {
    Parsed {
        /// Whether discovery would load the script
        candidate: bool,
        /// Names the base resolves to
        names: Vec<String>,
        /// Classes deriving from the base
        classes: Vec<String>,
    },
    /// Rendered diagnostic
    Failed(String),
}

#[derive(Debug)]
pub struct CheckEntry {
    pub path: PathBuf,
    pub screening: Screening,
}

/// Report data from screening scripts.
#[derive(Debug)]
pub struct CheckReport {
    /// The symbol scripts are screened for.
    pub base: String,
    pub entries: Vec<CheckEntry>,
}

impl CheckReport {
    /// Number of scripts that could not be parsed.
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.screening, Screening::Failed(_)))
            .count()
    }

    /// Whether every script parsed.
    pub fn is_valid(&self) -> bool {
        self.failures() == 0
    }
}

impl Report for CheckReport {
    fn render(&self, out: &mut dyn Output) {
        for entry in &self.entries {
            let path = entry.path.display().to_string();
            match &entry.screening {
                Screening::Failed(diagnostic) => {
                    out.warning(&format!("{} could not be parsed", path));
                    out.block(diagnostic);
                }
                Screening::Parsed {
                    candidate,
                    names,
                    classes,
                } => {
                    let verdict = if *candidate { "candidate" } else { "skipped" };
                    out.group(&format!("{} ({})", path, verdict));
                    if names.is_empty() {
                        out.field("Names", &format!("{} is not imported", self.base));
                    } else {
                        out.field("Names", &names.join(", "));
                    }
                    if !classes.is_empty() {
                        out.field("Classes", &classes.join(", "));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing::Recorder;

    #[test]
    fn test_render() {
        let report = CheckReport {
            base: "weft.ext.Extension".to_string(),
            entries: vec![
                CheckEntry {
                    path: PathBuf::from("a.py"),
                    screening: Screening::Parsed {
                        candidate: true,
                        names: vec!["weft.Extension".to_string()],
                        classes: vec!["A".to_string()],
                    },
                },
                CheckEntry {
                    path: PathBuf::from("b.py"),
                    screening: Screening::Parsed {
                        candidate: false,
                        names: Vec::new(),
                        classes: Vec::new(),
                    },
                },
            ],
        };

        let mut out = Recorder::default();
        report.render(&mut out);
        assert_eq!(
            out.lines,
            vec![
                "a.py (candidate):",
                "Names = weft.Extension",
                "Classes = A",
                "b.py (skipped):",
                "Names = weft.ext.Extension is not imported",
            ]
        );
        assert!(report.is_valid());
    }
}
