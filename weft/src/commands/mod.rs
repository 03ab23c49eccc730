mod check;
mod completions;
mod info;
mod list;
mod manifest;
mod run;

use std::path::{Path, PathBuf};

use check::CheckCommand;
use clap::{ArgAction, Parser, Subcommand};
use completions::CompletionsCommand;
use eyre::{Result, eyre};
use info::InfoCommand;
use list::ListCommand;
use manifest::ManifestCommand;
use run::RunCommand;
use weft_config::WeftToml;
use weft_loader::{DiscoveryOptions, Extensions, discover};

/// Extension trait for exiting on configuration errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for weft_config::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

/// Open the project holding `start`, looking in its ancestors too.
pub(crate) fn open_project(start: &Path) -> Result<WeftToml> {
    let path = WeftToml::find(start).ok_or_else(|| {
        eyre!(
            "no {} found in '{}' or its parents",
            weft_config::CONFIG_FILE,
            start.display()
        )
    })?;
    Ok(WeftToml::open(path).unwrap_or_exit())
}

/// Discover the extensions of a project.
pub(crate) fn project_extensions(project: &WeftToml) -> Extensions {
    discover(&DiscoveryOptions::from_project(project))
}

#[derive(Parser)]
#[command(name = "weft")]
#[command(version)]
#[command(about = "Discover code generation extensions and run them")]
pub(crate) struct Cli {
    /// Project directory (searched upwards for weft.toml)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Run(cmd) => cmd.run(&self.project),
            Commands::List(cmd) => cmd.run(&self.project),
            Commands::Info(cmd) => cmd.run(&self.project),
            Commands::Manifest(cmd) => cmd.run(&self.project),
            Commands::Check(cmd) => cmd.run(),
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run extensions over the project's sources
    Run(RunCommand),

    /// List discovered extensions
    List(ListCommand),

    /// Show details about one extension
    Info(InfoCommand),

    /// Write a manifest of the project's public extensions
    Manifest(ManifestCommand),

    /// Screen scripts and show how the extension base resolves in them
    Check(CheckCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
