//! Artifact directory scanning.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, RegistryResult};
use crate::naming::{ArtifactKind, NamingScheme};

/// File names found in an artifact directory, grouped by kind.
///
/// No ordering is implied by the order of the names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub dir: PathBuf,
    pub images: Vec<String>,
    pub symbol_maps: Vec<String>,
    pub configs: Vec<String>,
}

impl ScanResult {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn names(&self, kind: ArtifactKind) -> &[String] {
        match kind {
            ArtifactKind::Image => &self.images,
            ArtifactKind::SymbolMap => &self.symbol_maps,
            ArtifactKind::Config => &self.configs,
        }
    }

    fn names_mut(&mut self, kind: ArtifactKind) -> &mut Vec<String> {
        match kind {
            ArtifactKind::Image => &mut self.images,
            ArtifactKind::SymbolMap => &mut self.symbol_maps,
            ArtifactKind::Config => &mut self.configs,
        }
    }

    /// Record a file name under `kind`.
    pub fn push(&mut self, kind: ArtifactKind, name: impl Into<String>) {
        self.names_mut(kind).push(name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.symbol_maps.is_empty() && self.configs.is_empty()
    }

    pub fn total(&self) -> usize {
        self.images.len() + self.symbol_maps.len() + self.configs.len()
    }
}

/// Classify the entries of `dir` into images, symbol maps and configs.
///
/// Directories and entries with non UTF-8 names are ignored.
pub fn scan_directory(dir: &Path, scheme: &NamingScheme) -> RegistryResult<ScanResult> {
    let entries = fs::read_dir(dir).map_err(|source| RegistryError::DirectoryNotFound {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut result = ScanResult::new(dir);

    for entry in entries {
        let entry = entry.map_err(|source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        // is_dir follows symlinks, so links to directories are skipped as well.
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::debug!(name = ?raw, "skipping non UTF-8 entry");
                continue;
            }
        };

        if let Some(kind) = ArtifactKind::ALL
            .into_iter()
            .find(|kind| scheme.classifies(*kind, &name))
        {
            result.push(kind, name);
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        images = result.images.len(),
        symbol_maps = result.symbol_maps.len(),
        configs = result.configs.len(),
        "scanned artifact directory"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name).unwrap();
    }

    #[test]
    fn test_scan_classifies_entries() {
        let dir = TempDir::new().unwrap();
        for name in [
            "vmlinuz-5.7.10-gentoo",
            "System.map-5.7.10-gentoo",
            "config-5.7.10-gentoo",
            "vmlinuz-5.7.10-gentoo.old",
            "initramfs-5.7.10-gentoo.img",
            "config.txt",
            "vmlinuz-6.1.0-arch1",
        ] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("grub")).unwrap();
        fs::create_dir(dir.path().join("config-5.8.0-gentoo")).unwrap();

        let result = scan_directory(dir.path(), &NamingScheme::default()).unwrap();

        let mut images = result.images.clone();
        images.sort();
        assert_eq!(images, vec!["vmlinuz-5.7.10-gentoo", "vmlinuz-5.7.10-gentoo.old"]);
        assert_eq!(result.symbol_maps, vec!["System.map-5.7.10-gentoo"]);
        assert_eq!(result.configs, vec!["config-5.7.10-gentoo"]);
        assert_eq!(result.total(), 4);
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let result = scan_directory(dir.path(), &NamingScheme::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("boot");
        let err = scan_directory(&missing, &NamingScheme::default()).unwrap_err();
        assert!(matches!(err, RegistryError::DirectoryNotFound { .. }));
        assert!(err.to_string().contains("boot"));
    }

    #[test]
    fn test_scan_file_instead_of_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();
        let err = scan_directory(&file, &NamingScheme::default()).unwrap_err();
        assert!(matches!(err, RegistryError::DirectoryNotFound { .. }));
    }
}
