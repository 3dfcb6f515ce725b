//! Outcome of a retention pass.

use std::fmt;
use std::path::PathBuf;

use kbuild_registry::ArtifactKind;
use serde::Serialize;

/// One thing removed on behalf of a version record, in deletion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionTarget {
    Image,
    SymbolMap,
    Config,
    SourceDir,
    ModuleDir,
}

impl DeletionTarget {
    pub fn is_directory(self) -> bool {
        matches!(self, DeletionTarget::SourceDir | DeletionTarget::ModuleDir)
    }
}

impl From<ArtifactKind> for DeletionTarget {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Image => DeletionTarget::Image,
            ArtifactKind::SymbolMap => DeletionTarget::SymbolMap,
            ArtifactKind::Config => DeletionTarget::Config,
        }
    }
}

impl fmt::Display for DeletionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeletionTarget::Image => "image",
            DeletionTarget::SymbolMap => "symbol map",
            DeletionTarget::Config => "config",
            DeletionTarget::SourceDir => "source directory",
            DeletionTarget::ModuleDir => "module directory",
        })
    }
}

/// Why a target was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The path also belongs to a version that is kept.
    SharedWithKept,
    /// An earlier record in the same pass already removed it.
    AlreadyRemoved,
    /// `.old` records never remove the module tree of their version.
    OldGenerationModules,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::SharedWithKept => "shared with a kept version",
            SkipReason::AlreadyRemoved => "already removed",
            SkipReason::OldGenerationModules => "module tree of a .old generation",
        })
    }
}

/// A target that was deliberately not deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTarget {
    pub version: String,
    pub target: DeletionTarget,
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A deletion that failed. Non-fatal: the pass carries on with the next target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("failed to delete {target} {} of version {version}: {reason}", path.display())]
pub struct DeletionFailure {
    pub version: String,
    pub target: DeletionTarget,
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a retention pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    /// Number of version records found
    pub scanned: usize,
    /// Versions kept, newest first
    pub kept: Vec<String>,
    /// Versions selected for deletion, newest first
    pub deleted: Vec<String>,
    /// Paths removed (or that would be removed in dry-run mode)
    pub removed: Vec<PathBuf>,
    /// Targets left in place on purpose
    pub skipped: Vec<SkippedTarget>,
    /// Deletions that failed
    pub failures: Vec<DeletionFailure>,
    pub dry_run: bool,
}

impl RetentionReport {
    /// Whether every selected target was handled without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether nothing was selected for deletion.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty()
    }

    pub fn to_human(&self) -> String {
        let mut out = String::new();
        if self.is_noop() {
            out.push_str(&format!(
                "Only {} kernel(s) installed, not deleting any\n",
                self.scanned
            ));
            return out;
        }

        let verb = if self.dry_run { "Would delete" } else { "Deleted" };
        out.push_str(&format!(
            "{} {} of {} kernel version(s): {}\n",
            verb,
            self.deleted.len(),
            self.scanned,
            self.deleted.join(", ")
        ));
        out.push_str(&format!("Kept: {}\n", self.kept.join(", ")));
        for skipped in &self.skipped {
            out.push_str(&format!(
                "  Left {} {} ({})\n",
                skipped.target,
                skipped.path.display(),
                skipped.reason
            ));
        }
        for failure in &self.failures {
            out.push_str(&format!("  {}\n", failure));
        }
        out
    }
}
