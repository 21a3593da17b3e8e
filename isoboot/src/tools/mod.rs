//! External tool invocation.
//!
//! Every program isoboot runs (lsblk, parted, mkfs.*, grub-install, mount,
//! ...) is described as a [`ToolCommand`] and executed through a
//! [`CommandRunner`]. Tests substitute a recording runner.

mod privilege;

pub use privilege::{Credential, PrivilegeGate, PrivilegedRunner};

use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// A program invocation with fixed arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Needs root; routed through the privilege gate.
    pub privileged: bool,
    /// Written to the program's stdin, never logged.
    pub stdin: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCommand")
            .field("command", &self.to_string())
            .field("privileged", &self.privileged)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Exit status and captured output of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs tools to completion. No timeouts and no retries.
pub trait CommandRunner {
    /// Run `command` and capture its output, whatever its exit status.
    fn run(&self, command: &ToolCommand) -> IsobootResult<ToolOutput>;

    /// Run `command`, turning a non-zero exit into `ToolFailed`.
    fn run_checked(&self, command: &ToolCommand) -> IsobootResult<ToolOutput> {
        let output = self.run(command)?;
        if !output.is_success() {
            return Err(IsobootError::tool_failed(
                &command.program,
                output.status,
                output.stderr.trim(),
            ));
        }
        Ok(output)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &ToolCommand) -> IsobootResult<ToolOutput> {
        (**self).run(command)
    }
}

/// Runs tools as child processes of this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> IsobootResult<ToolOutput> {
        tracing::debug!(command = %command, "Running tool");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                IsobootError::Storage(format!("Failed to run {}: {}", command.program, e))
            })?;

        if let (Some(input), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).map_err(|e| {
                IsobootError::Storage(format!(
                    "Failed to write to {} stdin: {}",
                    command.program, e
                ))
            })?;
        }

        let output = child.wait_with_output().map_err(|e| {
            IsobootError::Storage(format!("Failed to wait for {}: {}", command.program, e))
        })?;

        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.is_success() {
            tracing::debug!(
                command = %command,
                status = ?result.status,
                stderr = %result.stderr.trim(),
                "Tool exited unsuccessfully"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_arguments() {
        let cmd = ToolCommand::new("mkfs.fat")
            .args(["-F", "32", "-n", "EFI"])
            .arg("/dev/sdb2");
        assert_eq!(cmd.to_string(), "mkfs.fat -F 32 -n EFI /dev/sdb2");
    }

    #[test]
    fn test_debug_redacts_stdin() {
        let cmd = ToolCommand::new("sudo").stdin("hunter2\n");
        let debug = format!("{:?}", cmd);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run(&ToolCommand::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_system_runner_feeds_stdin() {
        let output = SystemRunner
            .run(&ToolCommand::new("cat").stdin("hello"))
            .unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[test]
    fn test_run_checked_reports_failure() {
        let err = SystemRunner
            .run_checked(&ToolCommand::new("sh").args(["-c", "echo nope >&2; exit 1"]))
            .unwrap_err();
        match err {
            IsobootError::ToolFailed { tool, status, stderr } => {
                assert_eq!(tool, "sh");
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_error() {
        assert!(
            SystemRunner
                .run(&ToolCommand::new("isoboot-definitely-missing-tool"))
                .is_err()
        );
    }
}
