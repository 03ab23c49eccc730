use std::path::Path;

use clap::Args;
use eyre::Result;
use weft_loader::Environment;

use super::{open_project, project_extensions};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct RunCommand {
    /// Extensions to run, by short or qualified name (default: all)
    pub extensions: Vec<String>,

    /// Maximum parallelism of untagged tasks
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl RunCommand {
    pub fn run(&self, project: &Path) -> Result<()> {
        let project = open_project(project)?;
        let extensions = project_extensions(&project);
        let env = Environment::from_project(&project);

        let report = ops::run(&extensions, &env, &self.extensions, self.jobs)?;
        report.render(&mut TerminalOutput::new());

        Ok(())
    }
}
