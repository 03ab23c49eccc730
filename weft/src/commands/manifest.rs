use std::path::{Path, PathBuf};

use clap::Args;
use eyre::Result;

use super::{open_project, project_extensions};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct ManifestCommand {
    /// Where to write the manifest
    #[arg(short, long, default_value = weft_loader::loaders::MANIFEST_FILE)]
    pub output: PathBuf,

    /// Record paths relative to the manifest's directory
    #[arg(short, long)]
    pub relative: bool,
}

impl ManifestCommand {
    pub fn run(&self, project: &Path) -> Result<()> {
        let project = open_project(project)?;
        let extensions = project_extensions(&project);

        let report = ops::manifest(&extensions, &self.output, self.relative)?;
        report.render(&mut TerminalOutput::new());

        Ok(())
    }
}
