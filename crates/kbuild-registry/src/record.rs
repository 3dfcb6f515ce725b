//! Version records: one installed kernel and its three boot artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::ArtifactKind;
use crate::version::{Generation, KernelVersion, VersionKey};

/// A complete set of boot artifacts for one kernel version and generation.
///
/// All three paths are required, so a record with a missing sibling cannot
/// exist. Source and module directories are derived through
/// [`KernelLayout`](crate::KernelLayout) rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(flatten)]
    key: VersionKey,
    image: PathBuf,
    symbol_map: PathBuf,
    config: PathBuf,
}

impl VersionRecord {
    pub fn new(key: VersionKey, image: PathBuf, symbol_map: PathBuf, config: PathBuf) -> Self {
        Self {
            key,
            image,
            symbol_map,
            config,
        }
    }

    pub fn key(&self) -> VersionKey {
        self.key
    }

    pub fn version(&self) -> KernelVersion {
        self.key.version
    }

    pub fn release_candidate(&self) -> u32 {
        self.key.release_candidate
    }

    pub fn generation(&self) -> Generation {
        self.key.generation
    }

    pub fn is_old(&self) -> bool {
        self.key.generation.is_old()
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    pub fn symbol_map(&self) -> &Path {
        &self.symbol_map
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn artifact(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Image => &self.image,
            ArtifactKind::SymbolMap => &self.symbol_map,
            ArtifactKind::Config => &self.config,
        }
    }

    /// Human label, e.g. `5.9.2-r1.old`.
    pub fn label(&self) -> String {
        self.key.to_string()
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.key,
            file_name(&self.image),
            file_name(&self.symbol_map),
            file_name(&self.config)
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
