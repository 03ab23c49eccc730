use std::path::Path;

use clap::Args;
use eyre::Result;

use super::{open_project, project_extensions};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct ListCommand {
    /// Also list built-in commands
    #[arg(short, long)]
    pub all: bool,
}

impl ListCommand {
    pub fn run(&self, project: &Path) -> Result<()> {
        let project = open_project(project)?;
        let extensions = project_extensions(&project);

        let report = ops::list(&extensions, self.all);
        report.render(&mut TerminalOutput::new());

        Ok(())
    }
}
