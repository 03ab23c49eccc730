//! Tables owned by one discovery run.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, map::Entry};
use log::{debug, warn};

use crate::{Kind, LoadedExtension};

/// Extensions by qualified name. The first registrant of a name wins.
#[derive(Debug, Default)]
pub struct Registry {
    extensions: IndexMap<String, LoadedExtension>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension, returning `false` when its qualified name was
    /// taken and the extension was discarded.
    pub fn register(&mut self, loaded: LoadedExtension) -> bool {
        match self.extensions.entry(loaded.identity.qualified_name.clone()) {
            Entry::Occupied(existing) => {
                warn!(
                    "Extension '{}' from '{}' collides with the one from '{}', skipping it",
                    loaded.identity.qualified_name,
                    loaded.identity.path.display(),
                    existing.get().identity.path.display()
                );
                false
            }
            Entry::Vacant(slot) => {
                debug!(
                    "Registered {} extension '{}'",
                    loaded.identity.kind, loaded.identity.qualified_name
                );
                slot.insert(loaded);
                true
            }
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&LoadedExtension> {
        self.extensions.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.extensions.contains_key(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedExtension> {
        self.extensions.values()
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &LoadedExtension> {
        self.iter().filter(move |loaded| loaded.kind() == kind)
    }
}

impl IntoIterator for Registry {
    type Item = LoadedExtension;
    type IntoIter = indexmap::map::IntoValues<String, LoadedExtension>;

    fn into_iter(self) -> Self::IntoIter {
        self.extensions.into_values()
    }
}

/// Loaded script modules, keyed by project and module name.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: IndexMap<(Option<String>, String), PathBuf>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module. A name already bound to another file is refused.
    pub fn insert(&mut self, project: Option<&str>, name: &str, path: &Path) -> bool {
        match self.modules.entry((project.map(str::to_string), name.to_string())) {
            Entry::Occupied(existing) => existing.get() == path,
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                true
            }
        }
    }

    pub fn get(&self, project: Option<&str>, name: &str) -> Option<&Path> {
        self.modules
            .get(&(project.map(str::to_string), name.to_string()))
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Extension, ExtensionIdentity};

    struct Named(&'static str);

    impl Extension for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn loaded(name: &str, path: &str, kind: Kind) -> LoadedExtension {
        LoadedExtension::new(
            ExtensionIdentity::new(name, path, kind),
            Arc::new(Named("x")),
        )
    }

    #[test]
    fn test_first_registrant_wins() {
        let mut registry = Registry::new();

        assert!(registry.register(loaded("demo.a.x", "first.py", Kind::Public)));
        assert!(!registry.register(loaded("demo.a.x", "second.py", Kind::Private)));
        assert!(registry.register(loaded("demo.b.x", "third.py", Kind::Private)));

        assert_eq!(registry.len(), 2);
        let kept = registry.get("demo.a.x").unwrap();
        assert_eq!(kept.identity.path, PathBuf::from("first.py"));
        assert_eq!(kept.kind(), Kind::Public);
        assert_eq!(registry.of_kind(Kind::Private).count(), 1);
    }

    #[test]
    fn test_module_table() {
        let mut modules = ModuleTable::new();

        assert!(modules.insert(Some("demo"), "models", Path::new("a/models.py")));
        assert!(modules.insert(Some("demo"), "models", Path::new("a/models.py")));
        assert!(!modules.insert(Some("demo"), "models", Path::new("b/models.py")));
        assert!(modules.insert(Some("other"), "models", Path::new("b/models.py")));
        assert!(modules.insert(None, "models", Path::new("c/models.py")));

        assert_eq!(modules.len(), 3);
        assert_eq!(modules.get(Some("demo"), "models"), Some(Path::new("a/models.py")));
        assert_eq!(modules.get(None, "missing"), None);
    }
}
