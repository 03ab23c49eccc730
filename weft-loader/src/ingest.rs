//! Input selection and reading steps.

use std::path::Path;

use eyre::{Result, WrapErr};
use weft_pipeline::{Pipeline, Step};

use crate::{Invocation, Item};

/// Keep input files with the given suffix, and the given stem when set.
///
/// The suffix may be written with or without its leading dot.
pub fn select(suffix: impl Into<String>, stem: Option<String>) -> Step<Item, Invocation> {
    let suffix = suffix.into().trim_start_matches('.').to_string();
    Step::filter("ingest.select", move |item: &Item| match item {
        Item::Path(path) => {
            matches_suffix(path, &suffix)
                && stem
                    .as_deref()
                    .is_none_or(|stem| path.file_stem().is_some_and(|s| s == stem))
        }
        _ => false,
    })
}

fn matches_suffix(path: &Path, suffix: &str) -> bool {
    match path.extension() {
        Some(ext) => ext == suffix,
        None => suffix.is_empty(),
    }
}

/// Read selected input files as TOML.
pub fn read_toml() -> Step<Item, Invocation> {
    Step::map("ingest.toml", |item: Item| match item {
        Item::Path(path) => {
            let content = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;
            let value: toml::Value = toml::from_str(&content)
                .wrap_err_with(|| format!("failed to parse '{}'", path.display()))?;
            Ok(Item::Data { path, value })
        }
        other => Ok(other),
    })
}

/// Select and read TOML input files.
pub fn toml_files(suffix: impl Into<String>, stem: Option<String>) -> Pipeline<Item, Invocation> {
    Pipeline::new().then(select(suffix, stem)).then(read_toml())
}

/// Render a data item as pretty JSON.
pub fn to_json(value: &toml::Value) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).wrap_err("failed to render JSON")?;
    json.push('\n');
    Ok(json)
}

/// Render a data item as TOML.
pub fn to_toml(value: &toml::Value) -> Result<String> {
    toml::to_string_pretty(value).wrap_err("failed to render TOML")
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, sync::Arc};

    use tempfile::TempDir;

    use super::*;
    use crate::Extension;

    struct Plain;

    impl Extension for Plain {
        fn name(&self) -> &str {
            "plain"
        }
    }

    fn paths(items: &[Item]) -> Vec<PathBuf> {
        items.iter().map(|item| item.path().to_path_buf()).collect()
    }

    #[test]
    fn test_select_by_suffix_and_stem() {
        let ctx = Invocation::new(Arc::new(Plain), "demo.plain", "/p", "/p");
        let items = vec![
            Item::Path(PathBuf::from("a/models.toml")),
            Item::Path(PathBuf::from("b/models.json")),
            Item::Path(PathBuf::from("c/other.toml")),
            Item::Path(PathBuf::from("README")),
        ];

        let pipeline = Pipeline::new().then(select(".toml", None));
        let output = pipeline.run(items.clone(), &ctx, Some(1)).unwrap();
        assert_eq!(paths(&output), vec![PathBuf::from("a/models.toml"), PathBuf::from("c/other.toml")]);

        let pipeline = Pipeline::new().then(select("toml", Some("models".to_string())));
        let output = pipeline.run(items, &ctx, Some(1)).unwrap();
        assert_eq!(paths(&output), vec![PathBuf::from("a/models.toml")]);
    }

    #[test]
    fn test_read_toml() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.toml");
        let bad = dir.path().join("bad.toml");
        fs::write(&good, "name = \"x\"\n").unwrap();
        fs::write(&bad, "name = \n").unwrap();
        let ctx = Invocation::new(Arc::new(Plain), "demo.plain", dir.path(), dir.path());

        let pipeline = toml_files(".toml", Some("good".to_string()));
        let output = pipeline.run(vec![Item::Path(good.clone())], &ctx, Some(1)).unwrap();
        match &output[..] {
            [Item::Data { path, value }] => {
                assert_eq!(path, &good);
                assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("x"));
            }
            other => panic!("unexpected output: {:?}", other),
        }

        let err = toml_files(".toml", None)
            .run(vec![Item::Path(bad)], &ctx, Some(1))
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_renderers() {
        let value: toml::Value = toml::from_str("a = 1\n[b]\nc = true\n").unwrap();

        insta::assert_snapshot!(to_json(&value).unwrap().trim_end(), @r#"
        {
          "a": 1,
          "b": {
            "c": true
          }
        }
        "#);
        let toml = to_toml(&value).unwrap();
        assert!(toml.contains("a = 1"));
        assert!(toml.contains("[b]\nc = true"));
    }
}
