//! The extension interface.
//!
//! An extension turns project input files into generated files. Its work is
//! expressed as pipelines: one or more `ingest` pipelines select and read
//! input, followed by the context-bound `transform`, `validate`, `render`
//! and `write` steps. Every step receives the [`Invocation`] the run was
//! started with.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::{Result, bail};
use indexmap::{IndexMap, IndexSet};
use weft_core::{Content, File, WriteResult};
use weft_pipeline::{Pipeline, Step};

/// A value flowing through an extension's pipelines.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// An input file not read yet
    Path(PathBuf),
    /// Structured data read from `path`
    Data { path: PathBuf, value: toml::Value },
    /// A generated file, `path` relative to the output root
    Rendered { path: PathBuf, content: Content },
    /// A generated file that was written to `path`
    Written { path: PathBuf, result: WriteResult },
}

impl Item {
    /// The file this item refers to.
    pub fn path(&self) -> &Path {
        match self {
            Item::Path(path) => path,
            Item::Data { path, .. } | Item::Rendered { path, .. } | Item::Written { path, .. } => {
                path
            }
        }
    }
}

/// The input pipelines of an extension.
pub enum Ingest {
    /// The extension reads no input
    None,
    Single(Pipeline<Item, Invocation>),
    /// Separate inputs, each run on its own under its key
    Named(IndexMap<String, Pipeline<Item, Invocation>>),
}

impl Ingest {
    /// Pipelines to run, keyed when the ingest is named.
    pub fn into_pipelines(self) -> Vec<(Option<String>, Pipeline<Item, Invocation>)> {
        match self {
            Ingest::None => Vec::new(),
            Ingest::Single(pipeline) => vec![(None, pipeline)],
            Ingest::Named(pipelines) => pipelines
                .into_iter()
                .map(|(key, pipeline)| (Some(key), pipeline))
                .collect(),
        }
    }
}

/// A code generation plugin.
///
/// # Example
///
/// ```ignore
/// struct Upper;
///
/// impl Extension for Upper {
///     fn name(&self) -> &str {
///         "upper"
///     }
///
///     fn ingest(&self) -> Ingest {
///         Ingest::Single(weft_loader::ingest::toml_files(".toml", None))
///     }
///
///     fn render(&self, _ctx: &Invocation, item: Item) -> Result<Option<Item>> {
///         // ...
///     }
/// }
/// ```
pub trait Extension: Send + Sync + 'static {
    /// Short name, the last segment of the qualified name.
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Opt out of manifest export.
    fn private(&self) -> bool {
        false
    }

    fn ingest(&self) -> Ingest {
        Ingest::None
    }

    fn transform(&self, _ctx: &Invocation, item: Item) -> Result<Item> {
        Ok(item)
    }

    fn validate(&self, _ctx: &Invocation, _item: &Item) -> Result<()> {
        Ok(())
    }

    /// Turn an item into a generated file, or drop it by returning `None`.
    fn render(&self, _ctx: &Invocation, item: Item) -> Result<Option<Item>> {
        Ok(Some(item))
    }

    /// Parallelism tag of the render step.
    fn render_jobs(&self) -> Option<usize> {
        None
    }

    /// Steps running after ingest.
    fn steps(&self) -> Pipeline<Item, Invocation> {
        default_steps(self.render_jobs())
    }
}

/// `transform >> validate >> render >> write`, bound to the invocation.
pub fn default_steps(render_jobs: Option<usize>) -> Pipeline<Item, Invocation> {
    let transform = Step::<Item, Invocation>::method("transform", |ctx: &Invocation, items| {
        Box::new(items.map(move |item| item.and_then(|item| ctx.extension().transform(ctx, item))))
    });

    let validate = Step::<Item, Invocation>::method("validate", |ctx: &Invocation, items| {
        Box::new(items.map(move |item| {
            let item = item?;
            ctx.extension().validate(ctx, &item)?;
            Ok(item)
        }))
    });

    let mut render = Step::<Item, Invocation>::method("render", |ctx: &Invocation, items| {
        Box::new(items.filter_map(move |item| {
            item.and_then(|item| ctx.extension().render(ctx, item))
                .transpose()
        }))
    });
    if let Some(jobs) = render_jobs {
        render = render.jobs(jobs);
    }

    let write = Step::<Item, Invocation>::method("write", |ctx: &Invocation, items| {
        Box::new(items.map(move |item| item.and_then(|item| write_item(ctx, item))))
    });

    Pipeline::new()
        .then(transform)
        .then(validate)
        .then(render)
        .then(write)
}

fn write_item(ctx: &Invocation, item: Item) -> Result<Item> {
    match item {
        Item::Rendered { path, content } => {
            let target = ctx.out().join(&path);
            if ctx.is_input(&target) {
                bail!(
                    "'{}' would overwrite the input file '{}'",
                    path.display(),
                    target.display()
                );
            }
            let (path, result) = File::new(path, content).write_into(ctx.out())?;
            Ok(Item::Written { path, result })
        }
        other => Ok(other),
    }
}

/// Everything a running extension can see.
#[derive(Clone)]
pub struct Invocation {
    extension: Arc<dyn Extension>,
    qualified_name: String,
    root: PathBuf,
    out: PathBuf,
    settings: Option<toml::Value>,
    key: Option<String>,
    inputs: Arc<IndexSet<PathBuf>>,
}

impl Invocation {
    pub fn new(
        extension: Arc<dyn Extension>,
        qualified_name: impl Into<String>,
        root: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extension,
            qualified_name: qualified_name.into(),
            root: root.into(),
            out: out.into(),
            settings: None,
            key: None,
            inputs: Arc::default(),
        }
    }

    pub fn with_settings(mut self, settings: Option<toml::Value>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    /// Files the run reads; the write step refuses to replace them.
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.inputs = Arc::new(inputs.into_iter().map(|path| canonical(&path)).collect());
        self
    }

    /// The extension being run.
    pub fn extension(&self) -> &dyn Extension {
        self.extension.as_ref()
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Project root; input paths are relative to it when rendered.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output root for generated files.
    pub fn out(&self) -> &Path {
        &self.out
    }

    /// The extension's settings table from weft.toml.
    pub fn settings(&self) -> Option<&toml::Value> {
        self.settings.as_ref()
    }

    /// Look up one setting.
    pub fn setting(&self, key: &str) -> Option<&toml::Value> {
        self.settings.as_ref().and_then(|settings| settings.get(key))
    }

    /// Key of the named ingest pipeline currently running.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Check if `path` is one of the run's input files.
    pub fn is_input(&self, path: &Path) -> bool {
        path.exists() && self.inputs.contains(&canonical(path))
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("extension", &self.qualified_name)
            .field("root", &self.root)
            .field("out", &self.out)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    struct Shout;

    impl Extension for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn transform(&self, _ctx: &Invocation, item: Item) -> Result<Item> {
            match item {
                Item::Rendered { path, content } => Ok(Item::Rendered {
                    path,
                    content: Content::Text(String::from_utf8_lossy(content.as_bytes()).to_uppercase()),
                }),
                other => Ok(other),
            }
        }

        fn validate(&self, _ctx: &Invocation, item: &Item) -> Result<()> {
            if item.path().starts_with("forbidden") {
                eyre::bail!("'{}' is forbidden", item.path().display());
            }
            Ok(())
        }

        fn render(&self, ctx: &Invocation, item: Item) -> Result<Option<Item>> {
            // the key selects which items survive
            match ctx.key() {
                Some("skip") => Ok(None),
                _ => Ok(Some(item)),
            }
        }
    }

    /// Relies on every provided method.
    struct Passthrough;

    impl Extension for Passthrough {
        fn name(&self) -> &str {
            "passthrough"
        }
    }

    fn invocation(out: &Path) -> Invocation {
        Invocation::new(Arc::new(Shout), "demo.shout", out, out)
    }

    fn rendered(path: &str, text: &str) -> Item {
        Item::Rendered {
            path: PathBuf::from(path),
            content: Content::from(text),
        }
    }

    #[test]
    fn test_default_steps_display() {
        insta::assert_snapshot!(
            default_steps(Some(2)).to_string(),
            @"[object] *>> self.transform >> self.validate | 2>> self.render | *>> self.write"
        );
    }

    #[test]
    fn test_default_steps_write_rendered_items() {
        let dir = TempDir::new().unwrap();
        let ctx = invocation(dir.path());

        let output = default_steps(None)
            .run(vec![rendered("a.txt", "hello")], &ctx, Some(1))
            .unwrap();

        assert_eq!(
            output,
            vec![Item::Written {
                path: dir.path().join("a.txt"),
                result: WriteResult::Created,
            }]
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "HELLO");
    }

    #[test]
    fn test_provided_steps_bind_to_the_invocation() {
        let dir = TempDir::new().unwrap();
        let ext = Passthrough;
        let ctx = Invocation::new(Arc::new(Passthrough), "demo.passthrough", dir.path(), dir.path());

        insta::assert_snapshot!(
            ext.steps().to_string(),
            @"[object] *>> self.transform >> self.validate >> self.render >> self.write"
        );
        assert!(ext.ingest().into_pipelines().is_empty());
        assert_eq!(ext.description(), None);
        assert!(!ext.private());

        let output = ext
            .steps()
            .run(
                vec![rendered("a.txt", "hello"), Item::Path(PathBuf::from("in.toml"))],
                &ctx,
                Some(1),
            )
            .unwrap();

        assert_eq!(
            output,
            vec![
                Item::Written {
                    path: dir.path().join("a.txt"),
                    result: WriteResult::Created,
                },
                Item::Path(PathBuf::from("in.toml")),
            ]
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_render_can_drop_items() {
        let dir = TempDir::new().unwrap();
        let ctx = invocation(dir.path()).with_key(Some("skip".to_string()));

        let output = default_steps(None)
            .run(vec![rendered("a.txt", "hello")], &ctx, Some(1))
            .unwrap();

        assert!(output.is_empty());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_validation_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let ctx = invocation(dir.path());

        let err = default_steps(None)
            .run(
                vec![rendered("ok.txt", "x"), rendered("forbidden/b.txt", "y")],
                &ctx,
                Some(1),
            )
            .unwrap_err();
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn test_write_refuses_input_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, "original").unwrap();
        let ctx = invocation(dir.path()).with_inputs([input.clone()]);

        let err = default_steps(None)
            .run(vec![rendered("a.txt", "hello")], &ctx, Some(1))
            .unwrap_err();

        assert!(format!("{:#}", err).contains("would overwrite the input file"));
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "original");
        assert!(ctx.is_input(&dir.path().join("./a.txt")));
        assert!(!ctx.is_input(&dir.path().join("b.txt")));
    }

    #[test]
    fn test_ingest_pipelines_are_keyed() {
        let mut named = IndexMap::new();
        named.insert("a".to_string(), Pipeline::new());
        named.insert("b".to_string(), Pipeline::new());

        let keys: Vec<Option<String>> = Ingest::Named(named)
            .into_pipelines()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec![Some("a".to_string()), Some("b".to_string())]);
        assert!(Ingest::None.into_pipelines().is_empty());
    }

    #[test]
    fn test_invocation_settings() {
        let settings: toml::Value = toml::from_str("format = \"json\"").unwrap();
        let ctx = Invocation::new(Arc::new(Shout), "demo.shout", "/p", "/p/out")
            .with_settings(Some(settings));

        assert_eq!(ctx.setting("format").and_then(|v| v.as_str()), Some("json"));
        assert!(ctx.setting("missing").is_none());
        assert_eq!(ctx.extension().name(), "shout");
    }
}
