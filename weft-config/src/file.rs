use std::path::{Path, PathBuf};

use crate::{Config, Error, Result};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "weft.toml";

/// Represents a weft.toml file with both raw content and parsed config.
#[derive(Debug, Clone)]
pub struct WeftToml {
    path: PathBuf,
    content: String,
    config: Config,
}

impl WeftToml {
    /// Open and parse a weft.toml file.
    ///
    /// `path` may also be a project directory holding a weft.toml.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut path = path.as_ref().to_path_buf();
        if path.is_dir() {
            path.push(CONFIG_FILE);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Box::new(Error::Io {
                path: path.clone(),
                source: e,
            })
        })?;
        let filename = path.display().to_string();
        let config = Config::from_str_with_filename(&content, &filename)?;

        Ok(Self {
            path,
            content,
            config,
        })
    }

    /// Find the nearest weft.toml in `start` or any of its ancestors.
    pub fn find(start: impl AsRef<Path>) -> Option<PathBuf> {
        start
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the weft.toml.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Get the raw content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the parsed config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output root for generated files.
    pub fn output_dir(&self) -> PathBuf {
        match &self.config.project.output {
            Some(output) => self.root().join(output),
            None => self.root().to_path_buf(),
        }
    }

    /// Folders scanned for extension input files.
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        self.resolve_all(&self.config.project.sources)
    }

    /// Search roots for extension scripts.
    pub fn extension_dirs(&self) -> Vec<PathBuf> {
        self.resolve_all(&self.config.weft.extensions.folders)
    }

    /// Manifests the project imports extensions from.
    pub fn dependency_manifests(&self) -> Vec<PathBuf> {
        self.resolve_all(&self.config.weft.extensions.dependencies)
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|path| self.root().join(path)).collect()
    }
}
