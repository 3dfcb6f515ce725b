//! Registry error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::naming::ArtifactKind;

/// Errors raised while discovering installed kernels.
///
/// Every variant is fatal: the registry refuses to operate on an inconsistent
/// artifact set rather than guess.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("artifact directory not found or unreadable: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed {kind} file name '{name}': {reason}")]
    MalformedArtifactName {
        kind: ArtifactKind,
        name: String,
        reason: String,
    },

    #[error("no {kind} found for version {version}")]
    MissingArtifact { kind: ArtifactKind, version: String },

    #[error("more than one {kind} found for version {version}")]
    AmbiguousArtifact { kind: ArtifactKind, version: String },

    #[error("version {version} appears more than once in the registry")]
    DuplicateVersion { version: String },

    #[error("I/O error while reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RegistryError {
    pub(crate) fn malformed(kind: ArtifactKind, name: &str, reason: impl Into<String>) -> Self {
        RegistryError::MalformedArtifactName {
            kind,
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
