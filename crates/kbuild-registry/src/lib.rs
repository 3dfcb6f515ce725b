//! Discovery and ordering of installed kernel artifact sets.
//!
//! The registry scans a flat boot directory, tokenizes every image, symbol map
//! and config file name, and groups them into [`VersionRecord`]s ordered newest
//! first. Any inconsistency (malformed name, missing or duplicate sibling) is a
//! hard error: callers never act on a partially understood directory.

mod builder;
mod error;
mod layout;
mod naming;
mod ordering;
mod record;
mod registry;
mod scanner;
mod version;

pub use builder::{build_records, Lookup};
pub use error::{RegistryError, RegistryResult};
pub use layout::KernelLayout;
pub use naming::{ArtifactKind, ArtifactName, NamingScheme};
pub use ordering::{newest_first, sort_newest_first};
pub use record::VersionRecord;
pub use registry::Registry;
pub use scanner::{scan_directory, ScanResult};
pub use version::{Generation, KernelVersion, VersionKey, VersionParseError};
