use std::path::{Component, Path, PathBuf};

use eyre::{Result, WrapErr, bail};

/// Content of a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// UTF-8 text, written as-is
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Bytes(bytes) => bytes,
        }
    }

    /// Size of the content in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Bytes(value)
    }
}

/// What a write did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    /// File was created
    Created,
    /// An existing file was replaced
    Replaced,
}

/// A file produced by an extension.
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
    content: Content,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Content>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path relative to the write base.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Write the file below `base`, creating parent directories as needed.
    ///
    /// The path must stay inside `base`: absolute paths and `..` components
    /// are refused.
    pub fn write_into(&self, base: &Path) -> Result<(PathBuf, WriteResult)> {
        let escapes = self
            .path
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes || self.path.as_os_str().is_empty() {
            bail!("'{}' is not a path below the output root", self.path.display());
        }

        let target = base.join(&self.path);
        let result = if target.exists() {
            WriteResult::Replaced
        } else {
            WriteResult::Created
        };

        write_file(&target, self.content.as_bytes())
            .wrap_err_with(|| format!("failed to write '{}'", target.display()))?;
        Ok((target, result))
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
