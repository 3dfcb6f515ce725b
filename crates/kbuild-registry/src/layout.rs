//! Where a kernel's files live on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::naming::NamingScheme;
use crate::record::VersionRecord;

/// Filesystem roots of an installation.
///
/// Source and module directories are derived from a record's release string:
/// `<source_root>-<release>` and `<modules_root>/<release>`. A `.old` record
/// resolves to the same directories as the current record of its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelLayout {
    /// Directory holding images, symbol maps and configs (usually `/boot`).
    pub install_dir: PathBuf,
    /// Kernel source symlink, e.g. `/usr/src/linux`.
    pub source_root: PathBuf,
    /// Module tree root, e.g. `/lib/modules`.
    pub modules_root: PathBuf,
}

impl KernelLayout {
    pub fn new(
        install_dir: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        modules_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            source_root: source_root.into(),
            modules_root: modules_root.into(),
        }
    }

    pub fn source_dir(&self, record: &VersionRecord, scheme: &NamingScheme) -> PathBuf {
        let release = scheme.release(&record.version(), record.release_candidate());
        let mut dir = self.source_root.clone().into_os_string();
        dir.push(scheme.delimiter.to_string());
        dir.push(release);
        PathBuf::from(dir)
    }

    pub fn module_dir(&self, record: &VersionRecord, scheme: &NamingScheme) -> PathBuf {
        self.modules_root
            .join(scheme.release(&record.version(), record.release_candidate()))
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }
}

impl Default for KernelLayout {
    fn default() -> Self {
        Self::new("/boot", "/usr/src/linux", "/lib/modules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{Generation, KernelVersion, VersionKey};

    fn record(rc: u32, generation: Generation) -> VersionRecord {
        VersionRecord::new(
            VersionKey::new(KernelVersion::new(5, 7, 10), rc, generation),
            PathBuf::from("/boot/vmlinuz"),
            PathBuf::from("/boot/System.map"),
            PathBuf::from("/boot/config"),
        )
    }

    #[test]
    fn test_derived_directories() {
        let layout = KernelLayout::default();
        let scheme = NamingScheme::default();
        let current = record(0, Generation::Current);

        assert_eq!(
            layout.source_dir(&current, &scheme),
            PathBuf::from("/usr/src/linux-5.7.10-gentoo")
        );
        assert_eq!(
            layout.module_dir(&current, &scheme),
            PathBuf::from("/lib/modules/5.7.10-gentoo")
        );
    }

    #[test]
    fn test_release_candidate_directories() {
        let layout = KernelLayout::new("/mnt/boot", "/mnt/src/linux", "/mnt/modules");
        let scheme = NamingScheme::default();
        let rc = record(2, Generation::Current);

        assert_eq!(
            layout.source_dir(&rc, &scheme),
            PathBuf::from("/mnt/src/linux-5.7.10-gentoo-r2")
        );
        assert_eq!(
            layout.module_dir(&rc, &scheme),
            PathBuf::from("/mnt/modules/5.7.10-gentoo-r2")
        );
    }

    #[test]
    fn test_old_generation_shares_directories() {
        let layout = KernelLayout::default();
        let scheme = NamingScheme::default();
        let current = record(0, Generation::Current);
        let old = record(0, Generation::Old);

        assert_eq!(layout.source_dir(&current, &scheme), layout.source_dir(&old, &scheme));
        assert_eq!(layout.module_dir(&current, &scheme), layout.module_dir(&old, &scheme));
    }
}
