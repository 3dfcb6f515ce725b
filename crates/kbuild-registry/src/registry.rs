//! The in-memory registry of installed kernels.

use std::path::Path;

use serde::Serialize;

use crate::builder::build_records;
use crate::error::RegistryResult;
use crate::naming::NamingScheme;
use crate::ordering::sort_newest_first;
use crate::record::VersionRecord;
use crate::scanner::scan_directory;

/// Installed kernels, newest first.
///
/// Rebuilt from the filesystem on every scan; nothing is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registry {
    records: Vec<VersionRecord>,
}

impl Registry {
    /// Scan `dir` and build the registry.
    pub fn discover(dir: &Path, scheme: &NamingScheme) -> RegistryResult<Self> {
        let scan = scan_directory(dir, scheme)?;
        let records = build_records(&scan, scheme)?;
        let registry = Self::from_records(records)?;

        tracing::info!(
            dir = %dir.display(),
            versions = registry.len(),
            "discovered installed kernels"
        );
        Ok(registry)
    }

    /// Order `records` newest first.
    pub fn from_records(mut records: Vec<VersionRecord>) -> RegistryResult<Self> {
        sort_newest_first(&mut records)?;
        Ok(Self { records })
    }

    /// Records, newest first.
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }

    pub fn newest(&self) -> Option<&VersionRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionRecord> {
        self.records.iter()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Human-readable listing, one record per line.
    pub fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No installed kernels found.".to_string();
        }

        let mut out = format!("Installed kernels, newest to oldest ({} total):\n", self.len());
        for record in &self.records {
            out.push_str(&format!("    {}\n", record));
        }
        out
    }
}
