//! Directory traversal for discovery.
//!
//! Honours `.gitignore` files found along the way, skips hidden
//! directories and does not descend into nested projects.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::{debug, trace, warn};
use weft_config::CONFIG_FILE;

use crate::loaders::MANIFEST_FILE;

const IGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Clone)]
struct IgnoreRule {
    base: PathBuf,
    pattern: Pattern,
    dir_only: bool,
    anchored: bool,
}

impl IgnoreRule {
    fn parse(base: &Path, line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        if line.starts_with('!') {
            debug!("Negated ignore pattern '{}' is not supported", line);
            return None;
        }

        let (line, dir_only) = match line.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };
        let anchored = line.contains('/');
        let line = line.trim_start_matches('/');

        match Pattern::new(line) {
            Ok(pattern) => Some(Self {
                base: base.to_path_buf(),
                pattern,
                dir_only,
                anchored,
            }),
            Err(err) => {
                warn!("Ignoring invalid pattern '{}' in '{}': {}", line, base.display(), err);
                None
            }
        }
    }

    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.anchored {
            let options = MatchOptions {
                require_literal_separator: true,
                ..MatchOptions::new()
            };
            path.strip_prefix(&self.base)
                .is_ok_and(|relative| self.pattern.matches_path_with(relative, options))
        } else {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.pattern.matches(name))
        }
    }
}

fn read_rules(dir: &Path) -> Vec<IgnoreRule> {
    let path = dir.join(IGNORE_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => text
            .lines()
            .filter_map(|line| IgnoreRule::parse(dir, line))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Every file under `root`, sorted.
pub fn walk(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
    } else if root.is_dir() {
        visit(root, root, &[], &mut files);
    } else {
        debug!("Search root '{}' does not exist", root.display());
    }
    files.sort();
    files
}

fn visit(root: &Path, dir: &Path, inherited: &[IgnoreRule], files: &mut Vec<PathBuf>) {
    let mut rules = inherited.to_vec();
    rules.extend(read_rules(dir));

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Cannot read '{}': {}", dir.display(), err);
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    paths.sort();

    for path in paths {
        let is_dir = path.is_dir();
        if rules.iter().any(|rule| rule.matches(&path, is_dir)) {
            trace!("Ignored '{}'", path.display());
            continue;
        }

        if is_dir {
            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if hidden {
                continue;
            }
            if path != root && path.join(CONFIG_FILE).is_file() {
                debug!("Not descending into nested project '{}'", path.display());
                continue;
            }
            visit(root, &path, &rules, files);
        } else {
            files.push(path);
        }
    }
}

/// The first manifest found under `root`.
pub fn find_manifest(root: &Path) -> Option<PathBuf> {
    walk(root)
        .into_iter()
        .find(|path| path.file_name().is_some_and(|name| name == MANIFEST_FILE))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relative(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
        files
            .into_iter()
            .map(|path| {
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_walk_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.py");
        touch(dir.path(), "a/z.py");
        touch(dir.path(), "a/y.py");

        assert_eq!(relative(dir.path(), walk(dir.path())), vec!["a/y.py", "a/z.py", "b.py"]);
    }

    #[test]
    fn test_walk_skips_hidden_and_nested_projects() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "weft.toml");
        touch(dir.path(), ".git/config");
        touch(dir.path(), "nested/weft.toml");
        touch(dir.path(), "nested/ext.py");
        touch(dir.path(), "ext.py");

        assert_eq!(relative(dir.path(), walk(dir.path())), vec!["ext.py", "weft.toml"]);
    }

    #[test]
    fn test_walk_honours_gitignore() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".gitignore"),
            "# build output\n*.pyc\nbuild/\n/top.py\n!keep.pyc\n",
        )
        .unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "a.pyc");
        touch(dir.path(), "keep.pyc");
        touch(dir.path(), "top.py");
        touch(dir.path(), "build/out.py");
        touch(dir.path(), "sub/top.py");
        touch(dir.path(), "sub/b.pyc");
        fs::write(dir.path().join("sub/.gitignore"), "local.py\n").unwrap();
        touch(dir.path(), "sub/local.py");
        touch(dir.path(), "local.py");

        assert_eq!(
            relative(dir.path(), walk(dir.path())),
            vec![".gitignore", "a.py", "local.py", "sub/.gitignore", "sub/top.py"]
        );
    }

    #[test]
    fn test_find_manifest() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b/weft.manifest");
        touch(dir.path(), "a/weft.manifest");

        assert_eq!(find_manifest(dir.path()), Some(dir.path().join("a/weft.manifest")));
        assert_eq!(find_manifest(&dir.path().join("missing")), None);
    }
}
