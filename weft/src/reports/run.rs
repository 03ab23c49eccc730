//! Run command report data structures.

use std::path::PathBuf;

use weft_core::{WriteResult, plural};

use super::output::{Output, Report};

/// Files written by one extension.
#[derive(Debug)]
pub struct ExtensionRun {
    /// Qualified extension name.
    pub name: String,
    /// Written paths, relative to the output root when possible.
    pub written: Vec<(PathBuf, WriteResult)>,
}

/// Report data from running extensions.
#[derive(Debug)]
pub struct RunReport {
    /// Output root.
    pub out: PathBuf,
    pub runs: Vec<ExtensionRun>,
}

impl RunReport {
    pub fn file_count(&self) -> usize {
        self.runs.iter().map(|run| run.written.len()).sum()
    }
}

impl Report for RunReport {
    fn render(&self, out: &mut dyn Output) {
        if self.runs.is_empty() {
            out.block("No extensions to run");
            return;
        }

        for run in &self.runs {
            out.group(&run.name);
            if run.written.is_empty() {
                out.entry("nothing written");
            }
            for (path, result) in &run.written {
                let path = path.display().to_string();
                match result {
                    WriteResult::Created => out.created(&path),
                    WriteResult::Replaced => out.replaced(&path),
                }
            }
        }

        out.blank();
        out.block(&format!(
            "✓ {} written to {}",
            plural(self.file_count(), "file"),
            self.out.display()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing::Recorder;

    #[test]
    fn test_render() {
        let report = RunReport {
            out: PathBuf::from("out"),
            runs: vec![
                ExtensionRun {
                    name: "demo.models.models".to_string(),
                    written: vec![
                        (PathBuf::from("a.json"), WriteResult::Created),
                        (PathBuf::from("b.json"), WriteResult::Replaced),
                    ],
                },
                ExtensionRun {
                    name: "demo.views.views".to_string(),
                    written: Vec::new(),
                },
            ],
        };

        let mut out = Recorder::default();
        report.render(&mut out);
        assert_eq!(
            out.text(),
            "demo.models.models:\n+ a.json\n~ b.json\ndemo.views.views:\n- nothing written\n\n✓ 2 files written to out"
        );
    }
}
