//! Recording command runner for tests.
//!
//! [`RecordingRunner`] stands in for [`SystemRunner`](crate::runner::SystemRunner):
//! it executes nothing, remembers every invocation in order and can be told to
//! fail a particular command to exercise abort paths.
//!
//! ```
//! use kbuild::mock::RecordingRunner;
//! use kbuild::runner::{CommandRunner, Invocation};
//!
//! let runner = RecordingRunner::new().failing_on("emerge");
//! runner.run(&Invocation::new("make").arg("oldconfig")).unwrap();
//! assert!(runner.run(&Invocation::new("emerge").arg("@module-rebuild")).is_err());
//! assert_eq!(runner.command_lines(), vec!["make oldconfig", "emerge @module-rebuild"]);
//! ```

use std::cell::RefCell;

use crate::error::{UpdateError, UpdateResult};
use crate::runner::{CommandRunner, Invocation};

/// Runner that records invocations instead of spawning them.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: RefCell<Vec<Invocation>>,
    fail_prefix: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any invocation whose command line starts with `prefix`.
    pub fn failing_on(mut self, prefix: impl Into<String>) -> Self {
        self.fail_prefix = Some(prefix.into());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> UpdateResult<()> {
        self.invocations.borrow_mut().push(invocation.clone());

        let command = invocation.command_line();
        match &self.fail_prefix {
            Some(prefix) if command.starts_with(prefix.as_str()) => {
                Err(UpdateError::ExternalCommandFailed {
                    command,
                    status: "exit status: 2".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let runner = RecordingRunner::new();
        runner.run(&Invocation::new("make").arg("oldconfig")).unwrap();
        runner.run(&Invocation::new("make").arg("install")).unwrap();
        assert_eq!(runner.command_lines(), vec!["make oldconfig", "make install"]);
    }

    #[test]
    fn test_failure_is_recorded_too() {
        let runner = RecordingRunner::new().failing_on("make install");
        let err = runner.run(&Invocation::new("make").arg("install")).unwrap_err();
        assert_eq!(err.to_string(), "`make install` failed with exit status: 2");
        assert_eq!(runner.invocations().len(), 1);
    }
}
