//! Newest-first ordering of version records.
//!
//! Most significant first: major, minor, patch, release candidate, then the
//! generation, where the current install outranks its own `.old` backup.

use std::cmp::Ordering;

use crate::error::{RegistryError, RegistryResult};
use crate::record::VersionRecord;

/// Comparator placing newer records before older ones.
pub fn newest_first(a: &VersionRecord, b: &VersionRecord) -> Ordering {
    b.key().cmp(&a.key())
}

/// Stable-sort `records` newest first.
///
/// Two records with the same key are a data inconsistency and are reported as
/// [`RegistryError::DuplicateVersion`] instead of being silently tied.
pub fn sort_newest_first(records: &mut [VersionRecord]) -> RegistryResult<()> {
    records.sort_by(newest_first);

    if let Some(pair) = records.windows(2).find(|w| w[0].key() == w[1].key()) {
        return Err(RegistryError::DuplicateVersion {
            version: pair[0].label(),
        });
    }

    Ok(())
}
