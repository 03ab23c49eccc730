//! Extension discovery, loading and registry.
//!
//! Extensions come from four places:
//!
//! - the built-in commands shipped with weft
//! - Python-syntax scripts under the project's search roots, screened
//!   statically and built from their class declarations without being run
//! - manifests of other projects, whose entries load as inherited
//! - native Rust types implementing [`Extension`]
//!
//! [`discover`] collects them into one [`Registry`] in that order, and
//! [`run_extension`] runs one of them over a project's input files.

mod declared;
mod discovery;
mod extension;
mod identity;
pub mod ingest;
pub mod loaders;
mod registry;
mod runner;
pub mod walk;

pub use declared::{DeclaredExtension, Format};
pub use discovery::{DiscoveryOptions, Extensions, discover};
pub use extension::{Extension, Ingest, Invocation, Item, default_steps};
pub use identity::{ExtensionIdentity, Kind, LoadedExtension};
pub use loaders::{Manifest, ScriptLoader};
pub use registry::{ModuleTable, Registry};
pub use runner::{Environment, run_extension};
