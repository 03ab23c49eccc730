//! Cross-project extension manifests.
//!
//! A manifest is a TOML table mapping qualified extension names to the
//! scripts declaring them:
//!
//! ```toml
//! "demo.models.models" = "extensions/models.py"
//! ```

use std::path::{Component, Path, PathBuf};

use eyre::{Result, WrapErr};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{Kind, LoadedExtension, ModuleTable, ScriptLoader};

/// File name of a manifest inside a search root.
pub const MANIFEST_FILE: &str = "weft.manifest";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, PathBuf>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest of every public extension.
    ///
    /// With `relative_to`, paths are rewritten relative to that directory.
    pub fn export<'a>(
        extensions: impl IntoIterator<Item = &'a LoadedExtension>,
        relative_to: Option<&Path>,
    ) -> Self {
        let mut manifest = Self::new();
        for loaded in extensions {
            if loaded.kind() != Kind::Public {
                continue;
            }
            let path = match relative_to {
                Some(base) => relative_path(&loaded.identity.path, base),
                None => loaded.identity.path.clone(),
            };
            manifest.insert(loaded.qualified_name(), path);
        }
        manifest
    }

    pub fn insert(&mut self, qualified_name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(qualified_name.into(), path.into());
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Path> {
        self.entries.get(qualified_name).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse manifest text; relative paths stay as written.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a manifest, resolving relative paths against its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read manifest '{}'", path.display()))?;
        let mut manifest = Self::parse(&text)
            .wrap_err_with(|| format!("failed to parse manifest '{}'", path.display()))?;

        let dir = path.parent().unwrap_or(Path::new("."));
        for entry in manifest.entries.values_mut() {
            if entry.is_relative() {
                *entry = dir.join(&*entry);
            }
        }
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("failed to create '{}'", dir.display()))?;
        }
        std::fs::write(path, self.to_toml_string()?)
            .wrap_err_with(|| format!("failed to write manifest '{}'", path.display()))
    }

    /// Load the listed extensions as inherited.
    ///
    /// Each script is loaded once, under the module its entries name.
    /// Entries that fail to load are logged and skipped.
    pub fn load(&self, loader: &mut ScriptLoader, modules: &mut ModuleTable) -> Vec<LoadedExtension> {
        let mut scripts: IndexMap<(&str, &Path), Vec<&str>> = IndexMap::new();
        for (qualified_name, path) in self.iter() {
            match qualified_name.rsplit_once('.') {
                Some((module, _)) => scripts
                    .entry((module, path))
                    .or_default()
                    .push(qualified_name),
                None => warn!("Skipping manifest entry '{}': not a qualified name", qualified_name),
            }
        }

        let mut loaded = Vec::new();
        for ((module, path), names) in scripts {
            let found = match loader.load(modules, path, Some(module)) {
                Ok(found) => found,
                Err(err) => {
                    warn!("Skipping manifest entries of '{}': {:#}", path.display(), err);
                    continue;
                }
            };

            for name in names {
                match found.iter().find(|loaded| loaded.qualified_name() == name) {
                    Some(extension) => {
                        debug!("Inherited '{}' from '{}'", name, path.display());
                        let mut extension = extension.clone();
                        extension.identity.kind = Kind::Inherited;
                        loaded.push(extension);
                    }
                    None => warn!("'{}' declares no extension '{}'", path.display(), name),
                }
            }
        }
        loaded
    }
}

/// `path` relative to `base`, climbing with `..` where needed.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix(base) {
        return stripped.to_path_buf();
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && path.is_absolute() != base.is_absolute() {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    relative
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use tempfile::TempDir;

    use super::*;
    use crate::{Extension, ExtensionIdentity};

    struct Named;

    impl Extension for Named {
        fn name(&self) -> &str {
            "named"
        }
    }

    fn loaded(name: &str, path: &str, kind: Kind) -> LoadedExtension {
        LoadedExtension::new(ExtensionIdentity::new(name, path, kind), Arc::new(Named))
    }

    #[test]
    fn test_export_public_only() {
        let extensions = vec![
            loaded("demo.a.x", "/p/ext/a.py", Kind::Public),
            loaded("demo.b.y", "/p/ext/b.py", Kind::Private),
            loaded("lib.c.z", "/lib/c.py", Kind::Inherited),
            loaded("builtin.list", "", Kind::Builtin),
            loaded("demo.d.w", "/p/ext/sub/d.py", Kind::Public),
        ];

        let manifest = Manifest::export(&extensions, Some(Path::new("/p")));
        insta::assert_snapshot!(manifest.to_toml_string().unwrap().trim_end(), @r#"
        "demo.a.x" = "ext/a.py"
        "demo.d.w" = "ext/sub/d.py"
        "#);
    }

    #[test]
    fn test_open_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib/weft.manifest");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "\"lib.a.x\" = \"ext/a.py\"\n\"lib.b.y\" = \"/abs/b.py\"\n",
        )
        .unwrap();

        let manifest = Manifest::open(&path).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("lib.a.x"), Some(dir.path().join("lib/ext/a.py").as_path()));
        assert_eq!(manifest.get("lib.b.y"), Some(Path::new("/abs/b.py")));
    }

    #[test]
    fn test_parse_rejects_non_string_paths() {
        assert!(Manifest::parse("\"a.b\" = 1\n").is_err());
        assert!(Manifest::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(Path::new("/a/b/c.py"), Path::new("/a")), PathBuf::from("b/c.py"));
        assert_eq!(
            relative_path(Path::new("/a/b/c.py"), Path::new("/a/d")),
            PathBuf::from("../b/c.py")
        );
        assert_eq!(relative_path(Path::new("x/c.py"), Path::new("/a")), PathBuf::from("x/c.py"));
    }

    #[test]
    fn test_save_and_load_inherited() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("lib/ext/models.py");
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(
            &script,
            concat!(
                "from weft import Extension\n",
                "class Models(Extension):\n",
                "    format = 'json'\n",
                "class Views(Extension):\n",
                "    format = 'toml'\n",
            ),
        )
        .unwrap();

        let mut manifest = Manifest::new();
        manifest.insert("lib.models.models", "ext/models.py");
        manifest.insert("lib.models.views", "ext/models.py");
        manifest.insert("lib.models.missing", "ext/models.py");
        manifest.insert("lib.gone.x", "ext/gone.py");
        let path = dir.path().join("lib/weft.manifest");
        manifest.save(&path).unwrap();

        let mut loader = ScriptLoader::new(Some("app"));
        let mut modules = ModuleTable::new();
        let loaded = Manifest::open(&path).unwrap().load(&mut loader, &mut modules);

        let names: Vec<(&str, Kind)> = loaded
            .iter()
            .map(|loaded| (loaded.qualified_name(), loaded.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("lib.models.models", Kind::Inherited),
                ("lib.models.views", Kind::Inherited),
            ]
        );
    }
}
