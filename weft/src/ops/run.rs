//! Run operation - executing extension pipelines.

use eyre::Result;
use log::debug;
use weft_core::plural;
use weft_loader::{Environment, Extensions, Item, Kind, LoadedExtension, run_extension};

use crate::reports::{ExtensionRun, RunReport};

/// Execute the run operation.
///
/// Runs the named extensions, or every non-built-in extension when no name
/// is given. The first failing extension aborts the whole operation.
pub fn run(
    extensions: &Extensions,
    env: &Environment,
    names: &[String],
    jobs: Option<usize>,
) -> Result<RunReport> {
    let selected: Vec<&LoadedExtension> = if names.is_empty() {
        extensions
            .runnables()
            .filter(|loaded| loaded.kind() != Kind::Builtin)
            .collect()
    } else {
        names
            .iter()
            .map(|name| extensions.find(name))
            .collect::<Result<_>>()?
    };

    debug!("Running {}", plural(selected.len(), "extension"));

    let mut runs = Vec::new();
    for loaded in selected {
        let output = run_extension(loaded, env, jobs)?;
        let written = output
            .into_iter()
            .filter_map(|item| match item {
                Item::Written { path, result } => Some((
                    path.strip_prefix(&env.out).map(|p| p.to_path_buf()).unwrap_or(path),
                    result,
                )),
                _ => None,
            })
            .collect();
        runs.push(ExtensionRun {
            name: loaded.qualified_name().to_string(),
            written,
        });
    }

    Ok(RunReport {
        out: env.out.clone(),
        runs,
    })
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use tempfile::TempDir;
    use weft_core::WriteResult;
    use weft_loader::{DiscoveryOptions, discover};

    use super::*;

    fn setup() -> (TempDir, Extensions, Environment) {
        let dir = TempDir::new().unwrap();
        let ext = dir.path().join("extensions");
        fs::create_dir_all(&ext).unwrap();
        fs::write(
            ext.join("models.py"),
            "from weft import Extension\nclass Models(Extension):\n    format = 'json'\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/models.toml"), "id = 1\n").unwrap();

        let extensions = discover(&DiscoveryOptions::new(Some("demo")).folder(&ext));
        let env = Environment::new(dir.path())
            .with_sources(vec![dir.path().join("src")])
            .with_out(dir.path().join("out"));
        (dir, extensions, env)
    }

    #[test]
    fn test_run_all() {
        let (dir, extensions, env) = setup();

        let report = run(&extensions, &env, &[], Some(1)).unwrap();

        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].name, "demo.models.models");
        assert_eq!(
            report.runs[0].written,
            vec![(PathBuf::from("src/models.json"), WriteResult::Created)]
        );
        assert!(dir.path().join("out/src/models.json").is_file());
    }

    #[test]
    fn test_run_unknown_extension() {
        let (_dir, extensions, env) = setup();

        let err = run(&extensions, &env, &["nope".to_string()], None).unwrap_err();
        assert!(err.to_string().contains("no extension named 'nope'"));
    }

    #[test]
    fn test_run_builtin_points_at_subcommand() {
        let (_dir, extensions, env) = setup();

        let err = run(&extensions, &env, &["list".to_string()], None).unwrap_err();
        assert!(err.to_string().contains("run it as `weft list`"));
    }
}
