//! Errors that abort a kbuild run.

use std::io;
use std::path::PathBuf;

use kbuild_registry::RegistryError;
use thiserror::Error;

use crate::config::ConfigError;

/// Fatal errors. Any of these stops the update sequence immediately.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("this command must be run as root")]
    PermissionDenied,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("`{command}` failed with {status}")]
    ExternalCommandFailed { command: String, status: String },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("missing required host tools:\n{0}")]
    MissingTools(String),

    #[error("no installed kernel in {} to take the configuration from", .0.display())]
    NoInstalledKernel(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type UpdateResult<T> = Result<T, UpdateError>;
