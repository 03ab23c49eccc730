//! Resolving how a base symbol can be referenced from a script.

use std::path::Path;

use indexmap::IndexSet;
use log::{debug, warn};

use crate::{Class, Module, PackageExports, Symbol};

impl Module {
    /// Every dotted name under which `base` is reachable through this
    /// module's own imports.
    ///
    /// Package re-exports reported by `exports` add the names reachable
    /// through the shorter package path as well. The result keeps the order
    /// in which names are first found and holds no duplicates.
    pub fn possible_names(&self, base: &Symbol, exports: &dyn PackageExports) -> Vec<String> {
        let mut names = IndexSet::new();

        if base.is_builtin() {
            names.insert(base.name.clone());
            return names.into_iter().collect();
        }

        self.names_through(&base.module, &base.name, &mut names);

        for end in 1..base.module.len() {
            let package = &base.module[..end];
            if exports.exports(package).iter().any(|name| *name == base.name) {
                self.names_through(package, &base.name, &mut names);
            }
        }

        names.into_iter().collect()
    }

    fn names_through(&self, module: &[String], name: &str, names: &mut IndexSet<String>) {
        for import in &self.imports {
            // relative imports never reach an absolute base
            if import.level > 0 || !module.starts_with(&import.module) {
                continue;
            }
            let remainder = &module[import.module.len()..];

            let reference: Vec<&str> = match import.real_name() {
                None => {
                    let mut head: Vec<&str> = match &import.alias {
                        Some(alias) => vec![alias.as_str()],
                        None => import.module.iter().map(String::as_str).collect(),
                    };
                    head.extend(remainder.iter().map(String::as_str));
                    head.push(name);
                    head
                }
                Some("*") if remainder.is_empty() => vec![name],
                Some(real) => match remainder.split_first() {
                    Some((first, rest)) if first == real => {
                        let mut reference = vec![import.local_name()];
                        reference.extend(rest.iter().map(String::as_str));
                        reference.push(name);
                        reference
                    }
                    None if real == name => vec![import.local_name()],
                    _ => continue,
                },
            };

            names.insert(reference.join("."));
        }
    }

    /// Classes deriving directly from one of the names of `base`.
    pub fn subclasses(&self, base: &Symbol, exports: &dyn PackageExports) -> Vec<&Class> {
        let names = self.possible_names(base, exports);
        if names.is_empty() {
            return Vec::new();
        }
        self.classes
            .iter()
            .filter(|class| class.derives_from(names.as_slice()))
            .collect()
    }

    /// Classes deriving from `base`, directly or through another class
    /// declared earlier in this module.
    pub fn extension_classes(&self, base: &Symbol, exports: &dyn PackageExports) -> Vec<&Class> {
        let mut names = self.possible_names(base, exports);
        let mut found = Vec::new();

        for class in &self.classes {
            if class.derives_from(names.as_slice()) {
                names.push(class.name.clone());
                found.push(class);
            }
        }
        found
    }

    /// Check if this module declares at least one direct subclass of `base`.
    pub fn is_candidate(&self, base: &Symbol, exports: &dyn PackageExports) -> bool {
        !self.subclasses(base, exports).is_empty()
    }
}

/// Decide, without executing it, whether the script at `path` declares a
/// subclass of `base`.
///
/// Files named with a leading underscore or without a `.py` suffix are never
/// candidates. Scripts that cannot be read or parsed are logged and
/// rejected.
pub fn screen(path: &Path, base: &Symbol, exports: &dyn PackageExports) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if file_name.starts_with('_') || path.extension().is_none_or(|ext| ext != "py") {
        return false;
    }

    let module = match Module::load(path) {
        Ok(module) => module,
        Err(err) => {
            warn!("Skipping '{}': {}", path.display(), err);
            return false;
        }
    };

    let candidate = module.is_candidate(base, exports);
    debug!(
        "Screened '{}': {}",
        path.display(),
        if candidate { "candidate" } else { "no extension" }
    );
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoExports, StaticExports};

    fn base() -> Symbol {
        Symbol::new("weft.ext.Extension")
    }

    const IMPORT_FORMS: &[(&str, &str)] = &[
        ("from weft import ext", "ext.Extension"),
        ("from weft.ext import Extension", "Extension"),
        ("from weft import ext as t", "t.Extension"),
        ("from weft.ext import Extension as Base", "Base"),
        ("import weft", "weft.ext.Extension"),
        ("import weft.ext", "weft.ext.Extension"),
        ("import weft.ext as t", "t.Extension"),
        ("import weft as w", "w.ext.Extension"),
    ];

    #[test]
    fn test_import_forms_resolve() {
        for (import, reference) in IMPORT_FORMS {
            let text = format!("{}\n\nclass Foo({}):\n    pass\n", import, reference);
            let module = Module::parse(&text).unwrap();

            assert_eq!(
                module.possible_names(&base(), &NoExports),
                vec![reference.to_string()],
                "{}",
                import
            );
            assert!(module.is_candidate(&base(), &NoExports), "{}", import);
        }
    }

    #[test]
    fn test_unrelated_references_are_rejected() {
        let cases = [
            "from weft import ext\nclass Foo(Extension): pass\n",
            "import other\nclass Foo(other.Extension): pass\n",
            "class Foo(weft.ext.Extension): pass\n",
            "from weft.ext import Other\nclass Foo(Extension): pass\n",
            "from weft import Extension\nclass Foo(Extension): pass\n",
            "import weft.extras\nclass Foo(weft.extras.Extension): pass\n",
            "from . import ext\nclass Foo(ext.Extension): pass\n",
        ];
        for text in cases {
            let module = Module::parse(text).unwrap();
            assert!(!module.is_candidate(&base(), &NoExports), "{}", text);
        }
    }

    #[test]
    fn test_package_reexport() {
        let exports = StaticExports::new().package("weft", ["Extension"]);

        let module = Module::parse("from weft import Extension\nclass Foo(Extension): pass\n")
            .unwrap();
        assert_eq!(module.possible_names(&base(), &exports), vec!["Extension"]);
        assert!(module.is_candidate(&base(), &exports));

        let module = Module::parse("import weft\n").unwrap();
        assert_eq!(
            module.possible_names(&base(), &exports),
            vec!["weft.ext.Extension", "weft.Extension"]
        );
    }

    #[test]
    fn test_star_import() {
        let module = Module::parse("from weft.ext import *\nclass Foo(Extension): pass\n").unwrap();
        assert!(module.is_candidate(&base(), &NoExports));

        let module = Module::parse("from weft import *\nclass Foo(Extension): pass\n").unwrap();
        assert!(!module.is_candidate(&base(), &NoExports));
    }

    #[test]
    fn test_builtin_needs_no_import() {
        let module = Module::parse("class Foo(object): pass\n").unwrap();
        let object = Symbol::builtin("object");

        assert_eq!(module.possible_names(&object, &NoExports), vec!["object"]);
        assert!(module.is_candidate(&object, &NoExports));
    }

    #[test]
    fn test_names_are_deduplicated() {
        let module = Module::parse("import weft\nimport weft\nimport weft.ext\n").unwrap();
        assert_eq!(module.possible_names(&base(), &NoExports), vec!["weft.ext.Extension"]);
    }

    #[test]
    fn test_extension_classes_follow_in_file_inheritance() {
        let module = Module::parse(concat!(
            "from weft.ext import Extension\n",
            "class Helper: pass\n",
            "class Base(Extension): pass\n",
            "class Derived(Base): pass\n",
            "class Unrelated(Helper): pass\n",
        ))
        .unwrap();

        let direct: Vec<&str> = module
            .subclasses(&base(), &NoExports)
            .iter()
            .map(|class| class.name.as_str())
            .collect();
        assert_eq!(direct, vec!["Base"]);

        let all: Vec<&str> = module
            .extension_classes(&base(), &NoExports)
            .iter()
            .map(|class| class.name.as_str())
            .collect();
        assert_eq!(all, vec!["Base", "Derived"]);
    }
}
