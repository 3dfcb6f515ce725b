//! Checks run before anything touches the system.

use crate::error::{UpdateError, UpdateResult};

/// Whether the process runs with an effective UID of 0.
#[cfg(unix)]
pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Fail with [`UpdateError::PermissionDenied`] unless running as root.
pub fn require_root() -> UpdateResult<()> {
    if is_root() {
        Ok(())
    } else {
        Err(UpdateError::PermissionDenied)
    }
}

/// Whether `cmd` resolves on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that every `(command, package)` pair is available.
///
/// All missing tools are reported at once, one per line.
pub fn check_required_tools(tools: &[(&str, &str)]) -> UpdateResult<()> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("  {} (install: {})", tool, package))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(UpdateError::MissingTools(missing.join("\n")))
    }
}
