mod builtin;
mod manifest;
mod script;

pub use builtin::{BUILTIN_PREFIX, Builtin, builtins};
pub use manifest::{MANIFEST_FILE, Manifest, relative_path};
pub use script::{BASE_SYMBOL, ModuleName, NAMESPACE_MARKER, ScriptLoader};
