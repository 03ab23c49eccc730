use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::Extension;

/// How an extension entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Found by scanning, exported in manifests
    Public,
    /// Found by scanning, never exported
    Private,
    /// Imported from another project's manifest
    Inherited,
    /// Shipped with weft
    Builtin,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Public => "public",
            Kind::Private => "private",
            Kind::Inherited => "inherited",
            Kind::Builtin => "built-in",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The registered record of a discovered extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionIdentity {
    pub qualified_name: String,
    pub path: PathBuf,
    pub kind: Kind,
}

impl ExtensionIdentity {
    pub fn new(qualified_name: impl Into<String>, path: impl Into<PathBuf>, kind: Kind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            path: path.into(),
            kind,
        }
    }

    /// Last segment of the qualified name.
    pub fn short_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An identity together with the extension it names.
#[derive(Clone)]
pub struct LoadedExtension {
    pub identity: ExtensionIdentity,
    pub extension: Arc<dyn Extension>,
}

impl LoadedExtension {
    pub fn new(identity: ExtensionIdentity, extension: Arc<dyn Extension>) -> Self {
        Self {
            identity,
            extension,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.identity.qualified_name
    }

    pub fn kind(&self) -> Kind {
        self.identity.kind
    }
}

impl fmt::Debug for LoadedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedExtension")
            .field("identity", &self.identity)
            .field("name", &self.extension.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let identity = ExtensionIdentity::new("demo.models.models", "ext/models.py", Kind::Public);
        assert_eq!(identity.short_name(), "models");
        assert_eq!(
            ExtensionIdentity::new("plain", "", Kind::Builtin).short_name(),
            "plain"
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Builtin.to_string(), "built-in");
        assert_eq!(Kind::Inherited.to_string(), "inherited");
    }
}
