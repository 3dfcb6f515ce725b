//! kbuild - build, install and retire side-by-side Linux kernels
//!
//! Discovery and ordering of installed kernels lives in the `kbuild-registry`
//! crate. This crate adds configuration, the retention engine that deletes
//! everything beyond the newest N versions, and the update sequence that
//! drives `make`, `emerge` and `grub-mkconfig`.

pub mod config;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod preflight;
pub mod retention;
pub mod runner;

pub use config::{ConfigError, KbuildConfig};
pub use error::{UpdateError, UpdateResult};
pub use orchestrator::{KernelUpdater, UpdateMode, UpdateOptions, UpdateOutcome, UpdateStage};
pub use retention::{RetentionEngine, RetentionPolicy, RetentionReport};
pub use runner::{CommandRunner, Invocation, SystemRunner};

pub use kbuild_registry as registry;
