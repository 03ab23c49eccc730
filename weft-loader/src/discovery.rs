//! Finding every extension a project can run.
//!
//! Discovery never fails: scripts that cannot be read, parsed or loaded and
//! manifests that cannot be opened are logged and skipped.

use std::path::{Path, PathBuf};

use eyre::{Result, bail};
use log::{debug, info, warn};
use weft_config::WeftToml;
use weft_core::plural;

use crate::{
    Kind, LoadedExtension, ModuleTable, Registry,
    loaders::{Manifest, ScriptLoader, builtins},
    walk::{find_manifest, walk},
};

/// Where and how to look for extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOptions {
    /// Head of stable qualified names; without one every script is private
    pub project: Option<String>,
    /// Search roots for extension scripts
    pub folders: Vec<PathBuf>,
    /// Project source folders, screened when `inline` is set
    pub sources: Vec<PathBuf>,
    /// Explicit manifests to import
    pub dependencies: Vec<PathBuf>,
    /// Load the first manifest found under each search root
    pub inherit: bool,
    pub scripts: bool,
    pub inline: bool,
}

impl DiscoveryOptions {
    pub fn new(project: Option<&str>) -> Self {
        Self {
            project: project.map(str::to_string),
            folders: Vec::new(),
            sources: Vec::new(),
            dependencies: Vec::new(),
            inherit: true,
            scripts: true,
            inline: false,
        }
    }

    /// Options configured by a project's weft.toml.
    pub fn from_project(project: &WeftToml) -> Self {
        let extensions = &project.config().weft.extensions;
        Self {
            project: Some(project.config().name().to_string()),
            folders: project.extension_dirs(),
            sources: project.source_dirs(),
            dependencies: project.dependency_manifests(),
            inherit: extensions.inherit,
            scripts: extensions.scripts,
            inline: extensions.inline,
        }
    }

    pub fn folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folders.push(folder.into());
        self
    }

    pub fn dependency(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.dependencies.push(manifest.into());
        self
    }
}

/// Discover extensions: built-ins first, then scripts under the search
/// roots (and sources when inline), then manifests found under the search
/// roots, then explicit dependency manifests.
pub fn discover(options: &DiscoveryOptions) -> Extensions {
    let mut loader = options
        .sources
        .iter()
        .chain(&options.folders)
        .fold(ScriptLoader::new(options.project.as_deref()), |loader, root| {
            loader.package_root(root)
        });
    let mut modules = ModuleTable::new();
    let mut registry = Registry::new();

    for builtin in builtins() {
        registry.register(builtin);
    }

    if options.scripts {
        for folder in &options.folders {
            register_all(&mut registry, load_scripts(&mut loader, &mut modules, folder));
        }
        if options.inline {
            for source in &options.sources {
                register_all(&mut registry, load_scripts(&mut loader, &mut modules, source));
            }
        }
    }

    let mut manifests = Vec::new();
    if options.inherit {
        manifests.extend(options.folders.iter().filter_map(|folder| find_manifest(folder)));
    }
    manifests.extend(options.dependencies.iter().cloned());

    for path in manifests {
        match Manifest::open(&path) {
            Ok(manifest) => {
                debug!("Importing manifest '{}'", path.display());
                register_all(&mut registry, manifest.load(&mut loader, &mut modules));
            }
            Err(err) => warn!("Skipping manifest: {:#}", err),
        }
    }

    info!("Discovered {}", plural(registry.len(), "extension"));
    Extensions { registry }
}

fn load_scripts(
    loader: &mut ScriptLoader,
    modules: &mut ModuleTable,
    root: &Path,
) -> Vec<LoadedExtension> {
    let mut loaded = Vec::new();
    for path in walk(root) {
        match loader.load(modules, &path, None) {
            Ok(found) => loaded.extend(found),
            Err(err) => warn!("Skipping '{}': {:#}", path.display(), err),
        }
    }
    loaded
}

fn register_all(registry: &mut Registry, loaded: Vec<LoadedExtension>) {
    for extension in loaded {
        registry.register(extension);
    }
}

/// The result of one discovery run.
#[derive(Debug, Default)]
pub struct Extensions {
    registry: Registry,
}

impl Extensions {
    pub fn from_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every extension, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedExtension> {
        self.registry.iter()
    }

    /// Extensions that can be run: every kind, built-ins included.
    pub fn runnables(&self) -> impl Iterator<Item = &LoadedExtension> {
        self.registry.iter()
    }

    /// Extensions a manifest export lists.
    pub fn exportables(&self) -> impl Iterator<Item = &LoadedExtension> {
        self.registry.of_kind(Kind::Public)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Look up an extension by qualified name, or by short name when that is
    /// unambiguous.
    ///
    /// Short names resolve among discovered extensions first; a built-in
    /// only matches when nothing else does, so a project may reuse a
    /// built-in's name.
    pub fn find(&self, name: &str) -> Result<&LoadedExtension> {
        if let Some(loaded) = self.registry.get(name) {
            return Ok(loaded);
        }

        let (builtins, discovered): (Vec<&LoadedExtension>, Vec<&LoadedExtension>) = self
            .runnables()
            .filter(|loaded| loaded.identity.short_name() == name)
            .partition(|loaded| loaded.kind() == Kind::Builtin);
        let matches = if discovered.is_empty() { builtins } else { discovered };

        match matches.as_slice() {
            [found] => Ok(*found),
            [] => bail!("no extension named '{}'", name),
            many => {
                let names: Vec<&str> = many.iter().map(|loaded| loaded.qualified_name()).collect();
                bail!("'{}' is ambiguous, candidates: {}", name, names.join(", "))
            }
        }
    }

    /// Manifest of the public extensions.
    pub fn manifest(&self, relative_to: Option<&Path>) -> Manifest {
        Manifest::export(self.exportables(), relative_to)
    }
}

impl<'a> IntoIterator for &'a Extensions {
    type Item = &'a LoadedExtension;
    type IntoIter = Box<dyn Iterator<Item = &'a LoadedExtension> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.registry.iter())
    }
}
