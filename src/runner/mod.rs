//! External command execution.
//!
//! Build steps talk to `make`, `emerge` and `grub-mkconfig` through the
//! [`CommandRunner`] trait so the update sequence can be driven by a recording
//! runner in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{UpdateError, UpdateResult};

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Extra environment on top of the inherited one
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined with spaces, as a user would type them.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        f.write_str(&self.command_line())
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Run `invocation`, failing unless it exits successfully.
    fn run(&self, invocation: &Invocation) -> UpdateResult<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> UpdateResult<()> {
        (**self).run(invocation)
    }
}

/// Spawns real processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> UpdateResult<()> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        tracing::info!(command = %invocation, dir = ?invocation.working_dir, "running");

        let status = cmd.status().map_err(|e| UpdateError::Spawn {
            command: invocation.command_line(),
            source: e,
        })?;

        if !status.success() {
            return Err(UpdateError::ExternalCommandFailed {
                command: invocation.command_line(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("make")
            .arg("install")
            .current_dir("/usr/src/linux")
            .env("INSTALL_PATH", "/boot");

        assert_eq!(inv.command_line(), "make install");
        assert_eq!(inv.working_dir, Some(PathBuf::from("/usr/src/linux")));
        assert_eq!(inv.to_string(), "INSTALL_PATH=/boot make install");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_success() {
        SystemRunner.run(&Invocation::new("true")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_nonzero_exit() {
        let err = SystemRunner.run(&Invocation::new("false")).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::ExternalCommandFailed { ref command, .. } if command == "false"
        ));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run(&Invocation::new("kbuild-no-such-program-xyz"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_working_dir_and_env() {
        let dir = tempfile::TempDir::new().unwrap();
        SystemRunner
            .run(
                &Invocation::new("sh")
                    .args(["-c", "echo \"$KBUILD_MARK\" > marker"])
                    .current_dir(dir.path())
                    .env("KBUILD_MARK", "ok"),
            )
            .unwrap();
        let marker = std::fs::read_to_string(dir.path().join("marker")).unwrap();
        assert_eq!(marker.trim(), "ok");
    }
}
