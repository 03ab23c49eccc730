//! Running a loaded extension over a project.

use std::path::PathBuf;

use eyre::{Result, WrapErr, bail};
use indexmap::IndexSet;
use log::{debug, info};
use weft_config::WeftToml;
use weft_core::plural;

use crate::{Invocation, Item, Kind, LoadedExtension, walk::walk};

/// The project an extension runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub root: PathBuf,
    pub out: PathBuf,
    /// Folders holding input files
    pub sources: Vec<PathBuf>,
    /// Default parallelism when the caller sets none
    pub jobs: Option<usize>,
    /// Settings tables keyed by extension name
    pub settings: toml::Table,
}

impl Environment {
    /// An environment reading from and writing to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            out: root.clone(),
            sources: vec![root.clone()],
            root,
            jobs: None,
            settings: toml::Table::new(),
        }
    }

    pub fn from_project(project: &WeftToml) -> Self {
        Self {
            root: project.root().to_path_buf(),
            out: project.output_dir(),
            sources: project.source_dirs(),
            jobs: project.config().jobs(),
            settings: project.config().settings.clone(),
        }
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = out.into();
        self
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn settings_for(&self, name: &str) -> Option<&toml::Value> {
        self.settings.get(name)
    }

    /// Every input file under the source folders, each listed once.
    pub fn input_files(&self) -> Vec<PathBuf> {
        let files: IndexSet<PathBuf> = self.sources.iter().flat_map(|dir| walk(dir)).collect();
        files.into_iter().collect()
    }
}

/// Run every ingest pipeline of an extension, followed by its steps.
///
/// Each named ingest runs on its own, with the invocation recording its key.
/// A pipeline without pre-bound items reads the project's input files. The
/// first failing step aborts the run, and so does a write that would replace
/// an input file. Built-in commands cannot be run this way.
pub fn run_extension(
    loaded: &LoadedExtension,
    env: &Environment,
    max_jobs: Option<usize>,
) -> Result<Vec<Item>> {
    let extension = &loaded.extension;
    if loaded.kind() == Kind::Builtin {
        bail!(
            "'{}' is a built-in command and has no pipeline; run it as `weft {}`",
            loaded.qualified_name(),
            extension.name()
        );
    }
    let max_jobs = max_jobs.or(env.jobs);
    let settings = env.settings_for(extension.name()).cloned();
    let input_files = env.input_files();
    let mut output = Vec::new();

    for (key, ingest) in extension.ingest().into_pipelines() {
        let pipeline = ingest.then_pipeline(extension.steps());
        let items = match pipeline.items() {
            Some(items) => items.to_vec(),
            None => input_files.iter().cloned().map(Item::Path).collect(),
        };
        let read = items
            .iter()
            .filter(|item| matches!(item, Item::Path(_) | Item::Data { .. }))
            .map(|item| item.path().to_path_buf());
        debug!(
            "Running '{}'{}: {}",
            loaded.qualified_name(),
            key.as_deref().map(|key| format!(" [{}]", key)).unwrap_or_default(),
            pipeline
        );

        let ctx = Invocation::new(
            extension.clone(),
            loaded.qualified_name(),
            &env.root,
            &env.out,
        )
        .with_settings(settings.clone())
        .with_key(key.clone())
        .with_inputs(input_files.iter().cloned().chain(read));

        let produced = pipeline.run(items, &ctx, max_jobs).wrap_err_with(|| match &key {
            Some(key) => format!("extension '{}' failed on '{}'", loaded.qualified_name(), key),
            None => format!("extension '{}' failed", loaded.qualified_name()),
        })?;
        output.extend(produced);
    }

    info!(
        "'{}' produced {}",
        loaded.qualified_name(),
        plural(output.len(), "item")
    );
    Ok(output)
}
