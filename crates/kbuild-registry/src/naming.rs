//! Artifact file naming.
//!
//! Installed kernels follow `<prefix>-<X.Y.Z>-<localversion>[-r<N>][.old]`,
//! for example `vmlinuz-5.9.2-gentoo-r1.old`. Names are split into their
//! delimiter-separated tokens and compared field by field; a version is never
//! located by substring containment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::version::{Generation, KernelVersion, VersionKey};

/// The three per-version files installed to the boot directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    SymbolMap,
    Config,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Image,
        ArtifactKind::SymbolMap,
        ArtifactKind::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::SymbolMap => "symbol map",
            ArtifactKind::Config => "config",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming convention of the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingScheme {
    pub image_prefix: String,
    pub symbol_map_prefix: String,
    pub config_prefix: String,
    /// `CONFIG_LOCALVERSION` tag every managed kernel carries.
    pub local_version: String,
    pub delimiter: char,
    pub old_suffix: String,
    pub release_candidate_marker: char,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            image_prefix: "vmlinuz".to_string(),
            symbol_map_prefix: "System.map".to_string(),
            config_prefix: "config".to_string(),
            local_version: "gentoo".to_string(),
            delimiter: '-',
            old_suffix: ".old".to_string(),
            release_candidate_marker: 'r',
        }
    }
}

impl NamingScheme {
    /// Default scheme with a different local version tag.
    pub fn with_local_version(local_version: impl Into<String>) -> Self {
        Self {
            local_version: local_version.into(),
            ..Self::default()
        }
    }

    pub fn prefix(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Image => &self.image_prefix,
            ArtifactKind::SymbolMap => &self.symbol_map_prefix,
            ArtifactKind::Config => &self.config_prefix,
        }
    }

    /// Whether a directory entry looks like an artifact of `kind`.
    ///
    /// Only the prefix and local version tag are checked; malformed names are
    /// caught later by [`ArtifactName::parse`].
    pub fn classifies(&self, kind: ArtifactKind, file_name: &str) -> bool {
        let lead = format!("{}{}", self.prefix(kind), self.delimiter);
        let tag = format!("{}{}", self.delimiter, self.local_version);
        file_name
            .strip_prefix(&lead)
            .map(|rest| rest.contains(&tag))
            .unwrap_or(false)
    }

    /// Kernel release string, the name `make install` and `modules_install` use:
    /// `X.Y.Z-<localversion>[-rN]`.
    pub fn release(&self, version: &KernelVersion, release_candidate: u32) -> String {
        let mut release = format!("{}{}{}", version, self.delimiter, self.local_version);
        if release_candidate > 0 {
            release.push(self.delimiter);
            release.push(self.release_candidate_marker);
            release.push_str(&release_candidate.to_string());
        }
        release
    }

    /// File name an artifact of `kind` has for `key`.
    pub fn file_name(&self, kind: ArtifactKind, key: &VersionKey) -> String {
        let mut name = format!(
            "{}{}{}",
            self.prefix(kind),
            self.delimiter,
            self.release(&key.version, key.release_candidate)
        );
        if key.generation.is_old() {
            name.push_str(&self.old_suffix);
        }
        name
    }
}

/// A tokenized artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub key: VersionKey,
}

impl ArtifactName {
    /// Split `file_name` into its fields and extract the version key.
    pub fn parse(kind: ArtifactKind, file_name: &str, scheme: &NamingScheme) -> RegistryResult<Self> {
        let lead = format!("{}{}", scheme.prefix(kind), scheme.delimiter);
        let rest = file_name.strip_prefix(&lead).ok_or_else(|| {
            RegistryError::malformed(kind, file_name, format!("expected prefix '{}'", lead))
        })?;

        let (body, generation) = match rest.strip_suffix(scheme.old_suffix.as_str()) {
            Some(body) => (body, Generation::Old),
            None => (rest, Generation::Current),
        };

        let fields: Vec<&str> = body.split(scheme.delimiter).collect();
        if fields.len() != 2 && fields.len() != 3 {
            return Err(RegistryError::malformed(
                kind,
                file_name,
                format!(
                    "expected 2 or 3 fields after the prefix, got {}",
                    fields.len()
                ),
            ));
        }

        let version: KernelVersion = fields[0]
            .parse()
            .map_err(|e| RegistryError::malformed(kind, file_name, format!("version: {}", e)))?;

        if fields[1] != scheme.local_version {
            return Err(RegistryError::malformed(
                kind,
                file_name,
                format!(
                    "local version '{}' does not match '{}'",
                    fields[1], scheme.local_version
                ),
            ));
        }

        let release_candidate = match fields.get(2) {
            Some(token) => parse_release_candidate(token, scheme.release_candidate_marker)
                .ok_or_else(|| {
                    RegistryError::malformed(
                        kind,
                        file_name,
                        format!(
                            "release candidate '{}' is not '{}<N>' with N >= 1",
                            token, scheme.release_candidate_marker
                        ),
                    )
                })?,
            None => 0,
        };

        Ok(Self {
            kind,
            file_name: file_name.to_string(),
            key: VersionKey::new(version, release_candidate, generation),
        })
    }
}

fn parse_release_candidate(token: &str, marker: char) -> Option<u32> {
    let digits = token.strip_prefix(marker)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(kind: ArtifactKind, name: &str) -> RegistryResult<ArtifactName> {
        ArtifactName::parse(kind, name, &NamingScheme::default())
    }

    #[test]
    fn test_parse_plain_image() {
        let name = parse(ArtifactKind::Image, "vmlinuz-5.7.10-gentoo").unwrap();
        assert_eq!(name.key.version, KernelVersion::new(5, 7, 10));
        assert_eq!(name.key.release_candidate, 0);
        assert_eq!(name.key.generation, Generation::Current);
    }

    #[test]
    fn test_parse_old_release_candidate() {
        let name = parse(ArtifactKind::Image, "vmlinuz-5.9.2-gentoo-r1.old").unwrap();
        assert_eq!(name.key.version, KernelVersion::new(5, 9, 2));
        assert_eq!(name.key.release_candidate, 1);
        assert_eq!(name.key.generation, Generation::Old);
    }

    #[test]
    fn test_parse_symbol_map_with_dotted_prefix() {
        let name = parse(ArtifactKind::SymbolMap, "System.map-5.7.10-gentoo.old").unwrap();
        assert_eq!(name.key.version, KernelVersion::new(5, 7, 10));
        assert!(name.key.generation.is_old());
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = parse(ArtifactKind::Image, "vmlinuz-5.7.10").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedArtifactName { .. }));

        let err = parse(ArtifactKind::Image, "vmlinuz-5.7.10-gentoo-r1-extra").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedArtifactName { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_release_candidate() {
        for name in [
            "config-5.7.10-gentoo-rc1",
            "config-5.7.10-gentoo-r",
            "config-5.7.10-gentoo-r0",
            "config-5.7.10-gentoo-x1",
        ] {
            let err = parse(ArtifactKind::Config, name).unwrap_err();
            assert!(
                matches!(err, RegistryError::MalformedArtifactName { .. }),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_parse_rejects_foreign_local_version() {
        let err = parse(ArtifactKind::Image, "vmlinuz-5.7.10-gentoo1").unwrap_err();
        assert!(err.to_string().contains("local version"));
    }

    #[test]
    fn test_classifies_by_prefix_and_tag() {
        let scheme = NamingScheme::default();
        assert!(scheme.classifies(ArtifactKind::Image, "vmlinuz-5.7.10-gentoo"));
        assert!(scheme.classifies(ArtifactKind::Image, "vmlinuz-5.7.10-gentoo.old"));
        assert!(!scheme.classifies(ArtifactKind::Image, "vmlinuz-6.1.0-arch1"));
        assert!(!scheme.classifies(ArtifactKind::Image, "vmlinuz"));
        assert!(!scheme.classifies(ArtifactKind::Config, "config.txt"));
        assert!(scheme.classifies(ArtifactKind::SymbolMap, "System.map-5.7.10-gentoo"));
        assert!(!scheme.classifies(ArtifactKind::SymbolMap, "vmlinuz-5.7.10-gentoo"));
    }

    #[test]
    fn test_file_name_matches_parse() {
        let scheme = NamingScheme::default();
        let key = VersionKey::new(KernelVersion::new(5, 9, 2), 3, Generation::Old);
        assert_eq!(
            scheme.file_name(ArtifactKind::Config, &key),
            "config-5.9.2-gentoo-r3.old"
        );
        assert_eq!(scheme.release(&key.version, key.release_candidate), "5.9.2-gentoo-r3");
    }

    #[test]
    fn test_custom_local_version() {
        let scheme = NamingScheme::with_local_version("dist");
        let name = ArtifactName::parse(ArtifactKind::Image, "vmlinuz-6.6.1-dist", &scheme).unwrap();
        assert_eq!(name.key.version, KernelVersion::new(6, 6, 1));
    }
}
