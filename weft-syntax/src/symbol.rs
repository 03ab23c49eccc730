//! Target symbols and package re-export lookups.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::trace;

use crate::Module;

/// A dotted symbol such as `weft.ext.Extension`.
///
/// A symbol without a module is a builtin and is always reachable by its
/// bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub module: Vec<String>,
    pub name: String,
}

impl Symbol {
    /// Split a dotted path into module and name.
    pub fn new(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((module, name)) => Self {
                module: module.split('.').map(str::to_string).collect(),
                name: name.to_string(),
            },
            None => Self::builtin(path),
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            module: Vec::new(),
            name: name.into(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.module.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.module.join("."), self.name)
        }
    }
}

/// Source of package-level re-export lists (`__all__`).
pub trait PackageExports {
    /// Names the package at `package` re-exports.
    fn exports(&self, package: &[String]) -> Vec<String>;
}

/// No package re-exports anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExports;

impl PackageExports for NoExports {
    fn exports(&self, _package: &[String]) -> Vec<String> {
        Vec::new()
    }
}

/// Re-export lists known up front, keyed by dotted package path.
#[derive(Debug, Clone, Default)]
pub struct StaticExports {
    packages: IndexMap<String, Vec<String>>,
}

impl StaticExports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `package` re-exports `names`.
    pub fn package<I, S>(mut self, package: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages
            .entry(package.to_string())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }
}

impl PackageExports for StaticExports {
    fn exports(&self, package: &[String]) -> Vec<String> {
        self.packages
            .get(&package.join("."))
            .cloned()
            .unwrap_or_default()
    }
}

/// Reads `__all__` from `<root>/<package>/__init__.py` on disk.
#[derive(Debug, Clone)]
pub struct FileExports {
    root: PathBuf,
}

impl FileExports {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl PackageExports for FileExports {
    fn exports(&self, package: &[String]) -> Vec<String> {
        let mut path = self.root.clone();
        path.extend(package);
        path.push("__init__.py");

        if !path.is_file() {
            return Vec::new();
        }
        match Module::load(&path) {
            Ok(module) => module.exported_names().unwrap_or_default(),
            Err(err) => {
                trace!("Ignoring exports of '{}': {}", path.display(), err);
                Vec::new()
            }
        }
    }
}

impl<A: PackageExports, B: PackageExports> PackageExports for (A, B) {
    fn exports(&self, package: &[String]) -> Vec<String> {
        let mut names = self.0.exports(package);
        names.extend(self.1.exports(package));
        names
    }
}

impl<E: PackageExports> PackageExports for Vec<E> {
    fn exports(&self, package: &[String]) -> Vec<String> {
        self.iter().flat_map(|source| source.exports(package)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_symbol_new() {
        let symbol = Symbol::new("weft.ext.Extension");
        assert_eq!(symbol.module, path(&["weft", "ext"]));
        assert_eq!(symbol.name, "Extension");
        assert_eq!(symbol.to_string(), "weft.ext.Extension");

        let builtin = Symbol::new("object");
        assert!(builtin.is_builtin());
        assert_eq!(builtin.to_string(), "object");
    }

    #[test]
    fn test_static_exports() {
        let exports = StaticExports::new()
            .package("weft", ["Extension"])
            .package("weft", ["Step"]);

        assert_eq!(exports.exports(&path(&["weft"])), vec!["Extension", "Step"]);
        assert!(exports.exports(&path(&["weft", "ext"])).is_empty());
    }

    #[test]
    fn test_file_exports() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        std::fs::write(dir.path().join("pkg/__init__.py"), "__all__ = ['Thing', 'other']\n")
            .unwrap();
        std::fs::write(dir.path().join("pkg/sub/__init__.py"), "__all__ = [helper()]\n").unwrap();

        let exports = FileExports::new(dir.path());
        assert_eq!(exports.exports(&path(&["pkg"])), vec!["Thing", "other"]);
        assert!(exports.exports(&path(&["pkg", "sub"])).is_empty());
        assert!(exports.exports(&path(&["missing"])).is_empty());
    }

    #[test]
    fn test_chained_exports() {
        let first = StaticExports::new().package("a", ["X"]);
        let second = StaticExports::new().package("a", ["Y"]);

        assert_eq!((first, second).exports(&path(&["a"])), vec!["X", "Y"]);

        let roots = vec![
            StaticExports::new().package("a", ["Z"]),
            StaticExports::new().package("b", ["W"]),
        ];
        assert_eq!(roots.exports(&path(&["a"])), vec!["Z"]);
        assert!(Vec::<NoExports>::new().exports(&path(&["a"])).is_empty());
    }
}
