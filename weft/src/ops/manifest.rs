//! Manifest operation - exporting public extensions.

use std::path::Path;

use eyre::Result;
use weft_loader::Extensions;

use crate::reports::ManifestReport;

/// Execute the manifest operation.
///
/// With `relative`, paths are recorded relative to the manifest's directory
/// so the manifest can move together with the project.
pub fn manifest(extensions: &Extensions, output: &Path, relative: bool) -> Result<ManifestReport> {
    let base = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let base = std::fs::canonicalize(base).unwrap_or_else(|_| base.to_path_buf());

    let manifest = extensions.manifest(relative.then_some(base.as_path()));
    manifest.save(output)?;

    Ok(ManifestReport {
        path: output.to_path_buf(),
        entries: manifest
            .iter()
            .map(|(name, path)| (name.to_string(), path.to_path_buf()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use tempfile::TempDir;
    use weft_loader::{DiscoveryOptions, Manifest, discover};

    use super::*;

    #[test]
    fn test_manifest_relative() {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("extensions")).unwrap();
        fs::write(
            root.join("extensions/models.py"),
            "from weft import Extension\nclass Models(Extension): pass\n",
        )
        .unwrap();

        let extensions = discover(&DiscoveryOptions::new(Some("demo")).folder(root.join("extensions")));
        let output = root.join("weft.manifest");
        let report = manifest(&extensions, &output, true).unwrap();

        assert_eq!(
            report.entries,
            vec![(
                "demo.models.models".to_string(),
                PathBuf::from("extensions/models.py")
            )]
        );
        let saved = Manifest::parse(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(saved.get("demo.models.models"), Some(Path::new("extensions/models.py")));
    }
}
