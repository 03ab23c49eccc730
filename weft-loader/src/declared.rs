//! Extensions declared by script classes.
//!
//! A script class configures a stock pipeline through constants instead of
//! code:
//!
//! ```python
//! from weft import Extension
//!
//! class Models(Extension, name="models"):
//!     """Render model definitions as JSON."""
//!     suffix = ".toml"
//!     format = "json"
//!     jobs = 4
//!     required = ["name"]
//! ```

use std::str::FromStr;

use eyre::{Result, bail, eyre};
use indexmap::IndexMap;
use weft_core::{Content, dedent};
use weft_pipeline::Pipeline;
use weft_syntax::{Class, Constant};

use crate::{
    Extension, Ingest, Invocation, Item,
    ingest::{to_json, to_toml, toml_files},
};

/// Output format of a declared extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
        }
    }

    fn render(&self, value: &toml::Value) -> Result<String> {
        match self {
            Format::Json => to_json(value),
            Format::Toml => to_toml(value),
        }
    }
}

impl FromStr for Format {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            other => Err(eyre!("unknown format '{}', expected 'json' or 'toml'", other)),
        }
    }
}

/// An extension configured by a script class.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredExtension {
    name: String,
    class_name: String,
    description: Option<String>,
    private: bool,
    suffix: String,
    stem: String,
    format: Option<Format>,
    jobs: Option<usize>,
    required: Vec<String>,
}

impl DeclaredExtension {
    /// Build an extension from a class declaration.
    ///
    /// `inherited` holds the constants of the in-file classes it derives
    /// from; the class's own constants take precedence. Name, description and
    /// privacy are never inherited.
    pub fn from_class(class: &Class, inherited: &IndexMap<String, Constant>) -> Result<Self> {
        let mut attributes = inherited.clone();
        attributes.extend(class.constants.clone());
        attributes.extend(class.keywords.clone());

        let name = match class.attribute("name") {
            Some(Constant::Str(name)) if !name.is_empty() => name.clone(),
            Some(other) => bail!("'{}.name' must be a non-empty string, got {:?}", class.name, other),
            None => class.name.to_lowercase(),
        };

        let description = match class.constants.get("description") {
            Some(Constant::Str(text)) => Some(text.clone()),
            _ => class.docstring.as_deref().map(dedent),
        };

        let private = match class.attribute("private") {
            Some(Constant::Bool(private)) => *private,
            Some(other) => bail!("'{}.private' must be a boolean, got {:?}", class.name, other),
            None => false,
        };

        let suffix = string_attribute(&attributes, "suffix", &class.name)?
            .unwrap_or_else(|| ".toml".to_string());
        let stem = string_attribute(&attributes, "stem", &class.name)?.unwrap_or_else(|| name.clone());
        let format = string_attribute(&attributes, "format", &class.name)?
            .map(|format| format.parse::<Format>())
            .transpose()?;

        let jobs = match attributes.get("jobs") {
            Some(Constant::Int(jobs)) if *jobs > 0 => Some(*jobs as usize),
            Some(Constant::None) | None => None,
            Some(other) => bail!("'{}.jobs' must be a positive integer, got {:?}", class.name, other),
        };

        let required = match attributes.get("required") {
            Some(constant) => constant
                .as_str_list()
                .ok_or_else(|| eyre!("'{}.required' must be a list of strings", class.name))?,
            None => Vec::new(),
        };

        Ok(Self {
            name,
            class_name: class.name.clone(),
            description,
            private,
            suffix,
            stem,
            format,
            jobs,
            required,
        })
    }

    /// Name of the declaring class.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// Format override from the extension's settings table, else the class's.
    fn effective_format(&self, ctx: &Invocation) -> Result<Option<Format>> {
        match ctx.setting("format") {
            Some(toml::Value::String(format)) => format.parse().map(Some),
            Some(other) => bail!("setting 'format' must be a string, got {}", other),
            None => Ok(self.format),
        }
    }
}

fn string_attribute(
    attributes: &IndexMap<String, Constant>,
    key: &str,
    class: &str,
) -> Result<Option<String>> {
    match attributes.get(key) {
        Some(Constant::Str(value)) => Ok(Some(value.clone())),
        Some(Constant::None) | None => Ok(None),
        Some(other) => bail!("'{}.{}' must be a string, got {:?}", class, key, other),
    }
}

impl Extension for DeclaredExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn private(&self) -> bool {
        self.private
    }

    fn ingest(&self) -> Ingest {
        Ingest::Single(toml_files(self.suffix.clone(), Some(self.stem.clone())))
    }

    fn validate(&self, _ctx: &Invocation, item: &Item) -> Result<()> {
        let Item::Data { path, value } = item else {
            return Ok(());
        };
        for key in &self.required {
            if value.get(key).is_none() {
                bail!("'{}' is missing required key '{}'", path.display(), key);
            }
        }
        Ok(())
    }

    fn render(&self, ctx: &Invocation, item: Item) -> Result<Option<Item>> {
        let Item::Data { path, value } = item else {
            return Ok(Some(item));
        };
        let Some(format) = self.effective_format(ctx)? else {
            return Ok(None);
        };

        let Ok(relative) = path.strip_prefix(ctx.root()) else {
            bail!(
                "'{}' is outside the project root '{}'",
                path.display(),
                ctx.root().display()
            );
        };
        let rendered = relative.with_extension(format.extension());
        if ctx.out().join(&rendered) == path {
            bail!(
                "rendering '{}' as {} would overwrite it; set an output folder",
                path.display(),
                format.extension()
            );
        }

        Ok(Some(Item::Rendered {
            path: rendered,
            content: Content::Text(format.render(&value)?),
        }))
    }

    fn render_jobs(&self) -> Option<usize> {
        self.jobs
    }

    fn steps(&self) -> Pipeline<Item, Invocation> {
        crate::default_steps(self.jobs)
    }
}
