use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;
use toml::Spanned;

use crate::{
    Result, SourceContext,
    validate::{is_reserved, is_valid_version, validate_identifier},
};

/// Tables of weft.toml that configure weft itself rather than an extension.
const RESERVED_TABLES: &[&str] = &["project", "weft"];

/// Root schema for weft.toml
#[derive(Debug, Clone)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Tool options
    pub weft: WeftConfig,

    /// Every other table, keyed by the extension it configures
    pub settings: toml::Table,
}

/// `[project]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name, the head of every qualified extension name
    pub name: Spanned<String>,

    pub version: Option<Spanned<String>>,

    pub description: Option<String>,

    /// Folders scanned for extension input files
    #[serde(default = "default_sources")]
    pub sources: Vec<PathBuf>,

    /// Output root for generated files, the project root when unset
    pub output: Option<PathBuf>,
}

/// `[weft]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeftConfig {
    /// Default parallelism of pipeline runs
    pub jobs: Option<Spanned<usize>>,

    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

/// `[weft.extensions]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionsConfig {
    /// Search roots for extension scripts
    #[serde(default = "default_folders")]
    pub folders: Vec<PathBuf>,

    /// Load manifests found under the search roots
    #[serde(default = "default_true")]
    pub inherit: bool,

    /// Manifests of other projects to import extensions from
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,

    /// Load extension scripts
    #[serde(default = "default_true")]
    pub scripts: bool,

    /// Also screen scripts found under the project sources
    #[serde(default)]
    pub inline: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            folders: default_folders(),
            inherit: true,
            dependencies: Vec::new(),
            scripts: true,
            inline: false,
        }
    }
}

fn default_sources() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_folders() -> Vec<PathBuf> {
    vec![PathBuf::from("extensions")]
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct RawConfig {
    project: ProjectConfig,
    #[serde(default)]
    weft: WeftConfig,
}

impl FromStr for Config {
    type Err = Box<crate::Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_with_filename(s, "weft.toml")
    }
}

impl Config {
    /// Parse weft.toml content with a custom filename for error reporting
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        let ctx = SourceContext::new(content, filename);

        let raw: RawConfig = toml::from_str(content).map_err(|e| ctx.parse_error(e))?;
        let mut settings: toml::Table = toml::from_str(content).map_err(|e| ctx.parse_error(e))?;
        settings.retain(|key, _| !RESERVED_TABLES.contains(&key));

        let config = Self {
            project: raw.project,
            weft: raw.weft,
            settings,
        };
        config.validate(&ctx)?;
        Ok(config)
    }

    /// Project name
    pub fn name(&self) -> &str {
        self.project.name.get_ref()
    }

    /// Project version, if declared
    pub fn version(&self) -> Option<&str> {
        self.project.version.as_ref().map(|v| v.get_ref().as_str())
    }

    /// Default parallelism of pipeline runs
    pub fn jobs(&self) -> Option<usize> {
        self.weft.jobs.as_ref().map(|jobs| *jobs.get_ref())
    }

    /// Settings table configuring the extension `name`
    pub fn settings_for(&self, name: &str) -> Option<&toml::Value> {
        self.settings.get(name)
    }

    fn validate(&self, ctx: &SourceContext) -> Result<()> {
        let name = &self.project.name;
        if let Some(reason) = validate_identifier(name.get_ref()) {
            return Err(ctx.invalid_identifier_error(
                name.get_ref(),
                "project",
                reason,
                name.span(),
            ));
        }
        if is_reserved(name.get_ref()) {
            return Err(ctx.reserved_name_error(name.get_ref(), name.span()));
        }

        if let Some(version) = &self.project.version
            && !is_valid_version(version.get_ref())
        {
            return Err(ctx.validation_error_at(
                format!(
                    "invalid version '{}', expected dot-separated numbers like 0.1.0",
                    version.get_ref()
                ),
                version.span(),
            ));
        }

        if let Some(jobs) = &self.weft.jobs
            && *jobs.get_ref() == 0
        {
            return Err(ctx.validation_error_at("jobs must be at least 1", jobs.span()));
        }

        for (key, value) in &self.settings {
            if !value.is_table() {
                return Err(ctx.validation_error(format!(
                    "top-level key '{}' must be a table of extension settings",
                    key
                )));
            }
        }

        Ok(())
    }
}
