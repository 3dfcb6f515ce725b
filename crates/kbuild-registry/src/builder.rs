//! Version record construction.
//!
//! Every candidate name is tokenized and indexed by its exact version key, so
//! `5.1.0` never matches `15.1.0` or `5.1.0.old`, and `1.0` never matches
//! `1.0.1`. Exactly one sibling of each kind must exist for every image.

use std::collections::HashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::naming::{ArtifactKind, ArtifactName, NamingScheme};
use crate::record::VersionRecord;
use crate::scanner::ScanResult;
use crate::version::VersionKey;

/// Outcome of looking up one artifact kind for a version key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a ArtifactName),
    Missing,
    Ambiguous(Vec<&'a ArtifactName>),
}

/// Artifacts of a single kind indexed by version key.
#[derive(Debug, Default)]
struct ArtifactIndex {
    by_key: HashMap<VersionKey, Vec<ArtifactName>>,
}

impl ArtifactIndex {
    fn build(kind: ArtifactKind, names: &[String], scheme: &NamingScheme) -> RegistryResult<Self> {
        let mut by_key: HashMap<VersionKey, Vec<ArtifactName>> = HashMap::new();
        for name in names {
            let parsed = ArtifactName::parse(kind, name, scheme)?;
            by_key.entry(parsed.key).or_default().push(parsed);
        }
        Ok(Self { by_key })
    }

    fn lookup(&self, key: &VersionKey) -> Lookup<'_> {
        match self.by_key.get(key).map(Vec::as_slice) {
            None | Some([]) => Lookup::Missing,
            Some([only]) => Lookup::Found(only),
            Some(many) => Lookup::Ambiguous(many.iter().collect()),
        }
    }

    fn require(&self, kind: ArtifactKind, key: &VersionKey) -> RegistryResult<&ArtifactName> {
        match self.lookup(key) {
            Lookup::Found(name) => Ok(name),
            Lookup::Missing => Err(RegistryError::MissingArtifact {
                kind,
                version: key.to_string(),
            }),
            Lookup::Ambiguous(names) => {
                tracing::warn!(
                    %kind,
                    version = %key,
                    candidates = ?names.iter().map(|n| n.file_name.as_str()).collect::<Vec<_>>(),
                    "ambiguous artifact"
                );
                Err(RegistryError::AmbiguousArtifact {
                    kind,
                    version: key.to_string(),
                })
            }
        }
    }

    fn keys(&self) -> impl Iterator<Item = &VersionKey> {
        self.by_key.keys()
    }
}

/// Group scanned artifacts into version records.
///
/// Fails on the first malformed name, missing sibling, duplicate sibling or
/// sibling without an image. The returned records are unordered.
pub fn build_records(scan: &ScanResult, scheme: &NamingScheme) -> RegistryResult<Vec<VersionRecord>> {
    let images = ArtifactIndex::build(ArtifactKind::Image, &scan.images, scheme)?;
    let symbol_maps = ArtifactIndex::build(ArtifactKind::SymbolMap, &scan.symbol_maps, scheme)?;
    let configs = ArtifactIndex::build(ArtifactKind::Config, &scan.configs, scheme)?;

    // Sorted so that the first error reported is deterministic.
    let mut image_keys: Vec<VersionKey> = images.keys().copied().collect();
    image_keys.sort();

    let mut records = Vec::with_capacity(image_keys.len());
    for key in &image_keys {
        let image = images.require(ArtifactKind::Image, key)?;
        let symbol_map = symbol_maps.require(ArtifactKind::SymbolMap, key)?;
        let config = configs.require(ArtifactKind::Config, key)?;

        records.push(VersionRecord::new(
            *key,
            scan.dir.join(&image.file_name),
            scan.dir.join(&symbol_map.file_name),
            scan.dir.join(&config.file_name),
        ));
    }

    for (kind, index) in [
        (ArtifactKind::SymbolMap, &symbol_maps),
        (ArtifactKind::Config, &configs),
    ] {
        let mut orphans: Vec<&VersionKey> = index
            .keys()
            .filter(|key| images.lookup(key) == Lookup::Missing)
            .collect();
        orphans.sort();
        if let Some(key) = orphans.first() {
            tracing::warn!(%kind, version = %key, "artifact has no matching image");
            return Err(RegistryError::MissingArtifact {
                kind: ArtifactKind::Image,
                version: key.to_string(),
            });
        }
    }

    Ok(records)
}
