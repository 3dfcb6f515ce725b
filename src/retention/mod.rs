//! Retention of installed kernels.
//!
//! Keeps the newest `keep_count` versions and removes everything that belongs
//! to the rest: image, symbol map, config, source tree and (for the current
//! generation only) the module tree. Deletions are best effort; a failure is
//! recorded and the pass continues with the next target.

mod report;

pub use report::{DeletionFailure, DeletionTarget, RetentionReport, SkipReason, SkippedTarget};

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kbuild_registry::{ArtifactKind, KernelLayout, NamingScheme, Registry, RegistryResult, VersionRecord};
use serde::{Deserialize, Serialize};

/// How many versions to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Number of newest versions to keep. Treated as 1 when 0.
    pub keep_count: usize,
    /// Log but don't delete
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_count: 2,
            dry_run: false,
        }
    }
}

impl RetentionPolicy {
    /// Keep the `count` newest versions.
    pub fn keep_last_n(count: usize) -> Self {
        Self {
            keep_count: count,
            dry_run: false,
        }
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    fn effective_keep(&self) -> usize {
        self.keep_count.max(1)
    }
}

/// Split of a registry into kept and doomed records.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPlan<'a> {
    /// The newest records, untouched.
    pub keep: &'a [VersionRecord],
    /// The oldest records, to be removed, newest first.
    pub remove: &'a [VersionRecord],
}

/// Applies a [`RetentionPolicy`] to the kernels in an install directory.
pub struct RetentionEngine {
    layout: KernelLayout,
    scheme: NamingScheme,
    policy: RetentionPolicy,
}

impl RetentionEngine {
    pub fn new(layout: KernelLayout, scheme: NamingScheme, policy: RetentionPolicy) -> Self {
        Self {
            layout,
            scheme,
            policy,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Discover installed kernels and apply the policy.
    ///
    /// Discovery errors are returned before anything is deleted.
    pub fn run(&self) -> RegistryResult<RetentionReport> {
        let registry = Registry::discover(&self.layout.install_dir, &self.scheme)?;
        Ok(self.apply(&registry))
    }

    /// Select the records beyond the retention count.
    pub fn plan<'a>(&self, registry: &'a Registry) -> RetentionPlan<'a> {
        let records = registry.records();
        let split = self.policy.effective_keep().min(records.len());
        let (keep, remove) = records.split_at(split);
        RetentionPlan { keep, remove }
    }

    /// Every path removing `record` touches, in deletion order.
    pub fn targets(&self, record: &VersionRecord) -> Vec<(DeletionTarget, PathBuf)> {
        let mut targets: Vec<(DeletionTarget, PathBuf)> = ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind.into(), record.artifact(kind).to_path_buf()))
            .collect();
        targets.push((
            DeletionTarget::SourceDir,
            self.layout.source_dir(record, &self.scheme),
        ));
        targets.push((
            DeletionTarget::ModuleDir,
            self.layout.module_dir(record, &self.scheme),
        ));
        targets
    }

    /// Delete every record beyond the retention count.
    pub fn apply(&self, registry: &Registry) -> RetentionReport {
        let plan = self.plan(registry);
        let mut report = RetentionReport {
            scanned: registry.len(),
            kept: plan.keep.iter().map(VersionRecord::label).collect(),
            dry_run: self.policy.dry_run,
            ..Default::default()
        };

        if plan.remove.is_empty() {
            tracing::info!(
                installed = registry.len(),
                keep = self.policy.effective_keep(),
                "not deleting any kernels"
            );
            return report;
        }

        tracing::info!(
            count = plan.remove.len(),
            dry_run = self.policy.dry_run,
            "deleting old kernel versions"
        );

        let protected: HashSet<PathBuf> = plan
            .keep
            .iter()
            .flat_map(|record| self.targets(record))
            .map(|(_, path)| path)
            .collect();
        let mut removed: HashSet<PathBuf> = HashSet::new();

        for record in plan.remove {
            let version = record.label();
            tracing::info!(%version, "deleting version");

            for (target, path) in self.targets(record) {
                let skip = if target == DeletionTarget::ModuleDir && record.is_old() {
                    Some(SkipReason::OldGenerationModules)
                } else if protected.contains(&path) {
                    Some(SkipReason::SharedWithKept)
                } else if removed.contains(&path) {
                    Some(SkipReason::AlreadyRemoved)
                } else {
                    None
                };

                if let Some(reason) = skip {
                    tracing::debug!(%version, %target, path = %path.display(), %reason, "leaving in place");
                    report.skipped.push(SkippedTarget {
                        version: version.clone(),
                        target,
                        path,
                        reason,
                    });
                    continue;
                }

                if self.policy.dry_run {
                    tracing::info!(%version, %target, path = %path.display(), "DRY-RUN: would delete");
                } else if let Err(e) = remove_target(target, &path) {
                    tracing::warn!(%version, %target, path = %path.display(), error = %e, "deletion failed");
                    report.failures.push(DeletionFailure {
                        version: version.clone(),
                        target,
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                } else {
                    tracing::info!(%target, path = %path.display(), "deleted");
                }

                removed.insert(path.clone());
                report.removed.push(path);
            }

            report.deleted.push(version);
        }

        report
    }
}

fn remove_target(target: DeletionTarget, path: &Path) -> io::Result<()> {
    if target.is_directory() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
