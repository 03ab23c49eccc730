//! Check operation - screening scripts.

use std::path::{Path, PathBuf};

use weft_loader::{ScriptLoader, loaders::BASE_SYMBOL};
use weft_syntax::{Module, Symbol};

use crate::reports::{CheckEntry, CheckReport, Screening};

/// Execute the check operation.
///
/// Parses each script and reports the names `base` (the extension base when
/// unset) resolves to, and the classes deriving from it. Packages next to a
/// script count as re-exporting what their `__all__` lists.
pub fn check(files: &[PathBuf], base: Option<&str>) -> CheckReport {
    let base = Symbol::new(base.unwrap_or(BASE_SYMBOL));
    let entries = files
        .iter()
        .map(|path| {
            let root = path.parent().unwrap_or(Path::new("."));
            let loader = ScriptLoader::new(None)
                .with_base(base.clone())
                .package_root(root);
            CheckEntry {
                path: path.clone(),
                screening: screen(&loader, path),
            }
        })
        .collect();

    CheckReport {
        base: base.to_string(),
        entries,
    }
}

fn screen(loader: &ScriptLoader, path: &Path) -> Screening {
    let module = match Module::load(path) {
        Ok(module) => module,
        Err(err) => return Screening::Failed(format!("{:?}", miette::Report::new(*err))),
    };

    let names = module.possible_names(loader.base(), loader.exports());
    let classes = module
        .extension_classes(loader.base(), loader.exports())
        .into_iter()
        .map(|class| class.name.clone())
        .collect();

    Screening::Parsed {
        candidate: loader.screen(path),
        names,
        classes,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_check() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("models.py");
        fs::write(
            &good,
            "import weft as w\nclass Models(w.Extension): pass\nclass Child(Models): pass\n",
        )
        .unwrap();
        let private = dir.path().join("_hidden.py");
        fs::write(&private, "import weft\nclass Hidden(weft.Extension): pass\n").unwrap();
        let broken = dir.path().join("broken.py");
        fs::write(&broken, "import\n").unwrap();

        let report = check(&[good.clone(), private, broken], None);

        assert_eq!(report.base, "weft.ext.Extension");
        assert_eq!(report.failures(), 1);
        match &report.entries[0].screening {
            Screening::Parsed {
                candidate,
                names,
                classes,
            } => {
                assert!(candidate);
                assert_eq!(names, &vec!["w.ext.Extension".to_string(), "w.Extension".to_string()]);
                assert_eq!(classes, &vec!["Models".to_string(), "Child".to_string()]);
            }
            other => panic!("unexpected screening: {:?}", other),
        }
        match &report.entries[1].screening {
            Screening::Parsed { candidate, .. } => assert!(!candidate),
            other => panic!("unexpected screening: {:?}", other),
        }
        assert!(matches!(report.entries[2].screening, Screening::Failed(_)));
    }

    #[test]
    fn test_check_follows_package_exports() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/core.py"), "class Base: pass\n").unwrap();
        let script = dir.path().join("models.py");
        fs::write(&script, "from lib import Base\nclass Models(Base): pass\n").unwrap();

        let names = |report: &CheckReport| match &report.entries[0].screening {
            Screening::Parsed { names, .. } => names.clone(),
            other => panic!("unexpected screening: {:?}", other),
        };

        let report = check(std::slice::from_ref(&script), Some("lib.core.Base"));
        assert_eq!(report.base, "lib.core.Base");
        assert!(names(&report).is_empty());

        fs::write(
            dir.path().join("lib/__init__.py"),
            "from lib.core import Base\n__all__ = ['Base']\n",
        )
        .unwrap();
        let report = check(std::slice::from_ref(&script), Some("lib.core.Base"));
        assert_eq!(names(&report), vec!["Base".to_string()]);
        match &report.entries[0].screening {
            Screening::Parsed { candidate, classes, .. } => {
                assert!(candidate);
                assert_eq!(classes, &vec!["Models".to_string()]);
            }
            other => panic!("unexpected screening: {:?}", other),
        }
    }
}
