use std::path::Path;

use clap::Args;
use eyre::Result;

use super::{open_project, project_extensions};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct InfoCommand {
    /// Extension name, short or qualified
    pub name: String,
}

impl InfoCommand {
    pub fn run(&self, project: &Path) -> Result<()> {
        let project = open_project(project)?;
        let extensions = project_extensions(&project);

        let report = ops::info(&extensions, &project, &self.name)?;
        report.render(&mut TerminalOutput::new());

        Ok(())
    }
}
