//! Kernel version numbers and the ordering key derived from them.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `major.minor.patch` kernel version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl KernelVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Reason a version string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("expected three dot-separated fields, got {0}")]
    FieldCount(usize),

    #[error("field '{0}' is not a non-negative integer")]
    NotANumber(String),
}

impl FromStr for KernelVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() != 3 {
            return Err(VersionParseError::FieldCount(fields.len()));
        }

        let parse = |field: &str| -> Result<u32, VersionParseError> {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError::NotANumber(field.to_string()));
            }
            field
                .parse()
                .map_err(|_| VersionParseError::NotANumber(field.to_string()))
        };

        Ok(Self {
            major: parse(fields[0])?,
            minor: parse(fields[1])?,
            patch: parse(fields[2])?,
        })
    }
}

/// Which install generation a set of artifacts belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// The installed kernel.
    Current,
    /// The `.old` backup left behind when the same version was reinstalled.
    Old,
}

impl Generation {
    /// Numeric adjustment used in the ordering key.
    ///
    /// `.old` is penalised so that it always sorts below the current
    /// generation of the same numeric version.
    pub fn old_adjustment(self) -> i8 {
        match self {
            Generation::Current => 0,
            Generation::Old => -1,
        }
    }

    pub fn is_old(self) -> bool {
        matches!(self, Generation::Old)
    }
}

/// Identity and ordering key of a version record:
/// `(major, minor, patch, release_candidate, old_adjustment)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionKey {
    pub version: KernelVersion,
    /// `0` when the build is not a release candidate.
    pub release_candidate: u32,
    pub generation: Generation,
}

impl VersionKey {
    pub fn new(version: KernelVersion, release_candidate: u32, generation: Generation) -> Self {
        Self {
            version,
            release_candidate,
            generation,
        }
    }

    /// The key as a plain tuple, most significant field first.
    pub fn as_tuple(&self) -> (u32, u32, u32, u32, i8) {
        (
            self.version.major,
            self.version.minor,
            self.version.patch,
            self.release_candidate,
            self.generation.old_adjustment(),
        )
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)?;
        if self.release_candidate > 0 {
            write!(f, "-r{}", self.release_candidate)?;
        }
        if self.generation.is_old() {
            write!(f, ".old")?;
        }
        Ok(())
    }
}
