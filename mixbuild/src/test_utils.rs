//! Shared test utilities for the mixbuild crate.

use crate::error::{MixError, Result};
use crate::exec::{CommandExecutor, ToolEnv};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g. a checker path).
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd` with `args`, answering with `result`.
    pub fn new<C, A, S>(cmd: C, args: A, result: Result<Output>) -> Self
    where
        C: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            result,
        }
    }
}

/// A scripted implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects. The
/// tool environment passed to each call is captured for later inspection.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    seen_envs: RefCell<Vec<ToolEnv>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            seen_envs: RefCell::new(Vec::new()),
        }
    }

    /// Environments received so far, in call order.
    #[must_use]
    pub fn seen_envs(&self) -> Vec<ToolEnv> {
        self.seen_envs.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remaining: {:?}",
            remaining.len(),
            remaining.iter().map(|call| &call.cmd).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], env: &ToolEnv) -> Result<Output> {
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| MixError::StubMismatch {
                message: format!("unexpected invocation of {cmd} {}", args.join(" ")),
            })?;

        if call.cmd != cmd || call.args != args {
            return Err(MixError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{cmd} {}`",
                    call.cmd,
                    call.args.join(" "),
                    args.join(" ")
                ),
            });
        }

        self.seen_envs.borrow_mut().push(env.clone());
        call.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_returns_scripted_result() {
        let stub = StubExecutor::new(vec![ExpectedCall::new(
            "check_vintf",
            ["a.xml", "b.xml"],
            Ok(success_output()),
        )]);
        let output = stub
            .run("check_vintf", &["a.xml", "b.xml"], &ToolEnv::default())
            .expect("scripted call");
        assert!(output.status.success());
        stub.assert_finished();
    }

    #[test]
    fn stub_reports_mismatched_arguments() {
        let stub = StubExecutor::new(vec![ExpectedCall::new(
            "check_vintf",
            ["a.xml", "b.xml"],
            Ok(success_output()),
        )]);
        let err = stub
            .run("check_vintf", &["b.xml", "a.xml"], &ToolEnv::default())
            .expect_err("mismatch");
        assert!(matches!(err, MixError::StubMismatch { .. }));
    }

    #[test]
    fn stub_reports_unexpected_invocation() {
        let stub = StubExecutor::new(Vec::new());
        let err = stub
            .run("modify_system", &[], &ToolEnv::default())
            .expect_err("unexpected");
        assert!(err.to_string().contains("modify_system"));
    }
}
