use std::path::PathBuf;

use clap::Args;
use eyre::{Result, bail};

use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CheckCommand {
    /// Scripts to screen
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Dotted base class to screen against
    #[arg(long, value_name = "SYMBOL")]
    pub base: Option<String>,
}

impl CheckCommand {
    /// Run the check command
    pub fn run(&self) -> Result<()> {
        let report = ops::check(&self.files, self.base.as_deref());
        report.render(&mut TerminalOutput::new());

        if !report.is_valid() {
            bail!("{} could not be parsed", weft_core::plural(report.failures(), "script"));
        }
        Ok(())
    }
}
