//! The declaration surface of a parsed script.

use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{Error, Result, SourceContext, parser};

/// A literal value assigned at module or class level.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
    /// Lists, tuples and sets.
    List(Vec<Constant>),
    Dict(Vec<(Constant, Constant)>),
}

impl Constant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Interpret this constant as a list of strings, as used by `__all__`.
    pub fn as_str_list(&self) -> Option<Vec<String>> {
        match self {
            Constant::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

/// One imported name.
///
/// `import a.b as c` has no `name`; `from a.b import c as d` has `name`
/// set to `c`. Relative imports carry their leading dot count in `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: Option<String>,
    pub module: Vec<String>,
    pub alias: Option<String>,
    pub level: usize,
    pub span: Range<usize>,
}

impl Import {
    /// The name this import binds in the importing module.
    ///
    /// For an unaliased `import a.b` that is the head segment `a`.
    pub fn local_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        match &self.name {
            Some(name) => name,
            None => self.module.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// The imported symbol's own name, ignoring any alias.
    pub fn real_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if this is a `from ... import *` import.
    pub fn is_star(&self) -> bool {
        self.name.as_deref() == Some("*")
    }

    /// Dotted module path of this import.
    pub fn module_path(&self) -> String {
        self.module.join(".")
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "from {}{} import {}",
                ".".repeat(self.level),
                self.module_path(),
                name
            )?,
            None => write!(f, "import {}", self.module_path())?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        Ok(())
    }
}

/// A top-level class declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Class {
    pub name: String,
    /// Base expressions as written, dotted names normalized (`ext . Base`
    /// becomes `ext.Base`).
    pub bases: Vec<String>,
    /// Literal keyword arguments of the class header (`name="x"`).
    pub keywords: IndexMap<String, Constant>,
    /// Literal assignments made directly in the class body.
    pub constants: IndexMap<String, Constant>,
    pub docstring: Option<String>,
    pub span: Range<usize>,
}

impl Class {
    /// Check if any base expression equals one of `names`.
    pub fn derives_from<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.bases
            .iter()
            .any(|base| names.iter().any(|name| name.as_ref() == base))
    }

    /// Look up a header keyword, falling back to a body constant.
    pub fn attribute(&self, key: &str) -> Option<&Constant> {
        self.keywords.get(key).or_else(|| self.constants.get(key))
    }
}

/// Parsed script: imports, top-level constants and classes.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub path: Option<PathBuf>,
    pub imports: Vec<Import>,
    pub constants: IndexMap<String, Constant>,
    pub classes: Vec<Class>,
}

impl Module {
    /// Parse script text.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_named(text, "<script>")
    }

    /// Parse script text, naming it `filename` in diagnostics.
    pub fn parse_named(text: &str, filename: &str) -> Result<Self> {
        let ctx = SourceContext::new(text, filename);
        parser::parse(&ctx)
    }

    /// Read and parse a script file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            Box::new(Error::Decode {
                path: path.to_path_buf(),
            })
        })?;

        let mut module = Self::parse_named(&text, &path.display().to_string())?;
        module.path = Some(path.to_path_buf());
        Ok(module)
    }

    /// Find a class by name.
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// The `__all__` re-export list, if the module declares one.
    pub fn exported_names(&self) -> Option<Vec<String>> {
        self.constants.get("__all__").and_then(Constant::as_str_list)
    }
}
