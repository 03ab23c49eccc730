//! Loading extensions declared in Python-syntax scripts.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::{Result, WrapErr, bail};
use indexmap::IndexMap;
use log::{debug, warn};
use uuid::Uuid;
use weft_syntax::{Constant, FileExports, Module, PackageExports, StaticExports, Symbol};

use crate::{DeclaredExtension, Extension, ExtensionIdentity, Kind, LoadedExtension, ModuleTable};

/// The symbol every script extension derives from.
pub const BASE_SYMBOL: &str = "weft.ext.Extension";

/// Namespace marker of a script directory.
pub const NAMESPACE_MARKER: &str = "__init__.py";

/// A module name and whether it is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleName {
    pub name: String,
    pub stable: bool,
}

/// Loads [`DeclaredExtension`]s from scripts without executing them.
#[derive(Debug)]
pub struct ScriptLoader {
    project: Option<String>,
    base: Symbol,
    exports: (StaticExports, Vec<FileExports>),
    tokens: HashMap<PathBuf, String>,
}

impl ScriptLoader {
    pub fn new(project: Option<&str>) -> Self {
        Self {
            project: project.map(str::to_string),
            base: Symbol::new(BASE_SYMBOL),
            exports: (StaticExports::new().package("weft", ["Extension"]), Vec::new()),
            tokens: HashMap::new(),
        }
    }

    pub fn base(&self) -> &Symbol {
        &self.base
    }

    /// Screen against `base` instead of [`BASE_SYMBOL`].
    pub fn with_base(mut self, base: Symbol) -> Self {
        self.base = base;
        self
    }

    /// Also honor `__all__` of packages found on disk under `root`.
    pub fn package_root(mut self, root: impl AsRef<Path>) -> Self {
        self.exports.1.push(FileExports::new(root));
        self
    }

    pub fn exports(&self) -> &dyn PackageExports {
        &self.exports
    }

    /// Check whether `path` is worth loading.
    pub fn screen(&self, path: &Path) -> bool {
        weft_syntax::screen(path, &self.base, &self.exports)
    }

    /// Qualified module name for the script at `path`.
    ///
    /// Stable names are `<project>.<namespace>.<stem>`, where the namespace
    /// comes from the `__init__.py` next to the script (its `_NAME`, else
    /// the directory name). A marker declaring `_PUBLIC = False`, or a
    /// missing project name, yields a unique token instead.
    pub fn module_name(&mut self, path: &Path) -> ModuleName {
        let Some(project) = self.project.clone() else {
            return ModuleName {
                name: Uuid::new_v4().to_string(),
                stable: false,
            };
        };

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut segments = vec![project];
        let mut stable = true;

        if let Some(dir) = path.parent()
            && dir.join(NAMESPACE_MARKER).is_file()
        {
            let namespace = self.namespace(dir);
            stable = namespace.stable;
            segments.push(namespace.name);
        }
        segments.push(stem);

        ModuleName {
            name: segments.join("."),
            stable,
        }
    }

    fn namespace(&mut self, dir: &Path) -> ModuleName {
        if let Some(token) = self.tokens.get(dir) {
            return ModuleName {
                name: token.clone(),
                stable: false,
            };
        }

        let dir_name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let marker = match Module::load(dir.join(NAMESPACE_MARKER)) {
            Ok(marker) => marker,
            Err(err) => {
                warn!("Ignoring namespace marker in '{}': {}", dir.display(), err);
                return ModuleName {
                    name: dir_name,
                    stable: true,
                };
            }
        };

        if marker.constants.get("_PUBLIC").and_then(Constant::as_bool) == Some(false) {
            let token = Uuid::new_v4().to_string();
            self.tokens.insert(dir.to_path_buf(), token.clone());
            return ModuleName {
                name: token,
                stable: false,
            };
        }

        let name = marker
            .constants
            .get("_NAME")
            .and_then(Constant::as_str)
            .map(str::to_string)
            .unwrap_or(dir_name);
        ModuleName { name, stable: true }
    }

    /// Load every extension the script at `path` declares.
    ///
    /// `module_hint` replaces the derived module name, as manifests do.
    /// Scripts that do not pass screening yield nothing.
    pub fn load(
        &mut self,
        modules: &mut ModuleTable,
        path: &Path,
        module_hint: Option<&str>,
    ) -> Result<Vec<LoadedExtension>> {
        if !self.screen(path) {
            return Ok(Vec::new());
        }
        let module =
            Module::load(path).wrap_err_with(|| format!("failed to load '{}'", path.display()))?;

        let module_name = match module_hint {
            Some(hint) => ModuleName {
                name: hint.to_string(),
                stable: true,
            },
            None => self.module_name(path),
        };
        if !modules.insert(self.project.as_deref(), &module_name.name, path) {
            bail!(
                "module name '{}' of '{}' is already taken",
                module_name.name,
                path.display()
            );
        }
        debug!("Loading '{}' as '{}'", path.display(), module_name.name);

        let mut inherited: IndexMap<String, IndexMap<String, Constant>> = IndexMap::new();
        let mut loaded = Vec::new();

        for class in module.extension_classes(&self.base, &self.exports) {
            let mut constants = IndexMap::new();
            for base in &class.bases {
                if let Some(parent) = inherited.get(base) {
                    constants.extend(parent.clone());
                }
            }

            let extension = DeclaredExtension::from_class(class, &constants)
                .wrap_err_with(|| format!("invalid extension class '{}'", class.name))?;

            constants.extend(class.constants.clone());
            inherited.insert(class.name.clone(), constants);

            let kind = if !module_name.stable || extension.private() {
                Kind::Private
            } else {
                Kind::Public
            };
            let qualified_name = format!("{}.{}", module_name.name, extension.name());
            debug!("Found extension '{}' ({})", qualified_name, kind);

            loaded.push(LoadedExtension::new(
                ExtensionIdentity::new(qualified_name, path, kind),
                Arc::new(extension),
            ));
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn script(dir: &Path, relative: &str, text: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    const MODELS: &str = "from weft import Extension\n\nclass Models(Extension):\n    format = 'json'\n";

    #[test]
    fn test_module_name_from_stem() {
        let dir = TempDir::new().unwrap();
        let path = script(dir.path(), "models.py", MODELS);

        let mut loader = ScriptLoader::new(Some("demo"));
        assert_eq!(
            loader.module_name(&path),
            ModuleName {
                name: "demo.models".to_string(),
                stable: true,
            }
        );
    }

    #[test]
    fn test_module_name_from_namespace() {
        let dir = TempDir::new().unwrap();
        let plain = script(dir.path(), "tools/models.py", MODELS);
        script(dir.path(), "tools/__init__.py", "");
        let named = script(dir.path(), "other/models.py", MODELS);
        script(dir.path(), "other/__init__.py", "_NAME = 'gen'\n");

        let mut loader = ScriptLoader::new(Some("demo"));
        assert_eq!(loader.module_name(&plain).name, "demo.tools.models");
        assert_eq!(loader.module_name(&named).name, "demo.gen.models");
    }

    #[test]
    fn test_private_namespace_shares_token() {
        let dir = TempDir::new().unwrap();
        let a = script(dir.path(), "hidden/a.py", MODELS);
        let b = script(dir.path(), "hidden/b.py", MODELS);
        script(dir.path(), "hidden/__init__.py", "_PUBLIC = False\n");

        let mut loader = ScriptLoader::new(Some("demo"));
        let a = loader.module_name(&a);
        let b = loader.module_name(&b);

        assert!(!a.stable);
        let (a_ns, b_ns) = (a.name.split('.').nth(1), b.name.split('.').nth(1));
        assert_eq!(a_ns, b_ns);
        assert!(a.name.ends_with(".a"));
    }

    #[test]
    fn test_no_project_is_private() {
        let dir = TempDir::new().unwrap();
        let path = script(dir.path(), "models.py", MODELS);

        let mut loader = ScriptLoader::new(None);
        let mut modules = ModuleTable::new();
        let loaded = loader.load(&mut modules, &path, None).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].kind(), Kind::Private);
        assert!(loaded[0].qualified_name().ends_with(".models"));
        assert_ne!(loaded[0].qualified_name(), "models");
    }

    #[test]
    fn test_load_classes() {
        let dir = TempDir::new().unwrap();
        let path = script(
            dir.path(),
            "models.py",
            concat!(
                "import weft\n",
                "\n",
                "class Base(weft.ext.Extension):\n",
                "    format = 'json'\n",
                "\n",
                "class Secret(Base, private=True):\n",
                "    pass\n",
                "\n",
                "class Helper:\n",
                "    pass\n",
            ),
        );

        let mut loader = ScriptLoader::new(Some("demo"));
        let mut modules = ModuleTable::new();
        let loaded = loader.load(&mut modules, &path, None).unwrap();

        let names: Vec<(&str, Kind)> = loaded
            .iter()
            .map(|loaded| (loaded.qualified_name(), loaded.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("demo.models.base", Kind::Public),
                ("demo.models.secret", Kind::Private),
            ]
        );
        assert_eq!(modules.get(Some("demo"), "demo.models"), Some(path.as_path()));
    }

    #[test]
    fn test_load_with_hint() {
        let dir = TempDir::new().unwrap();
        let path = script(dir.path(), "models.py", MODELS);

        let mut loader = ScriptLoader::new(Some("app"));
        let mut modules = ModuleTable::new();
        let loaded = loader.load(&mut modules, &path, Some("lib.models")).unwrap();

        assert_eq!(loaded[0].qualified_name(), "lib.models.models");
    }

    #[test]
    fn test_load_skips_non_candidates() {
        let dir = TempDir::new().unwrap();
        let path = script(dir.path(), "plain.py", "class Models:\n    pass\n");

        let mut loader = ScriptLoader::new(Some("demo"));
        let mut modules = ModuleTable::new();
        assert!(loader.load(&mut modules, &path, None).unwrap().is_empty());
        assert!(modules.is_empty());
    }

    #[test]
    fn test_load_rejects_taken_module_name() {
        let dir = TempDir::new().unwrap();
        let a = script(dir.path(), "a/models.py", MODELS);
        let b = script(dir.path(), "b/models.py", MODELS);

        let mut loader = ScriptLoader::new(Some("demo"));
        let mut modules = ModuleTable::new();
        assert_eq!(loader.load(&mut modules, &a, None).unwrap().len(), 1);

        let err = loader.load(&mut modules, &b, None).unwrap_err();
        assert!(err.to_string().contains("already taken"));
    }

    #[test]
    fn test_invalid_class_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = script(
            dir.path(),
            "models.py",
            "from weft import Extension\nclass Models(Extension):\n    format = 'yaml'\n",
        );

        let mut loader = ScriptLoader::new(Some("demo"));
        let err = loader
            .load(&mut ModuleTable::new(), &path, None)
            .unwrap_err();
        assert!(err.to_string().contains("invalid extension class 'Models'"));
    }
}
