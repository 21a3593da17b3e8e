//! Privileged execution gate.
//!
//! One credential is captured per run and reused for every privileged
//! call. When already running as root, commands run directly.

use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::fmt;

use super::{CommandRunner, ToolCommand, ToolOutput};

/// Password for sudo. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// How privileged commands are executed.
#[derive(Debug, Clone)]
pub enum PrivilegeGate {
    /// Effective uid is 0.
    Root,
    /// `sudo -S` with the captured credential on stdin.
    Sudo(Credential),
}

impl PrivilegeGate {
    pub fn is_root() -> bool {
        nix::unistd::geteuid().is_root()
    }

    /// Rewrite `command` for execution through this gate.
    pub fn apply(&self, command: &ToolCommand) -> ToolCommand {
        match self {
            PrivilegeGate::Sudo(credential) if command.privileged => {
                let mut stdin = format!("{}\n", credential.expose());
                if let Some(input) = &command.stdin {
                    stdin.push_str(input);
                }
                ToolCommand {
                    program: "sudo".to_string(),
                    args: ["-S", "-p", "", "--", command.program.as_str()]
                        .into_iter()
                        .map(String::from)
                        .chain(command.args.iter().cloned())
                        .collect(),
                    privileged: false,
                    stdin: Some(stdin),
                }
            }
            _ => ToolCommand {
                privileged: false,
                ..command.clone()
            },
        }
    }

    /// Check the credential once, before anything destructive runs.
    pub fn validate<R: CommandRunner + ?Sized>(&self, runner: &R) -> IsobootResult<()> {
        let PrivilegeGate::Sudo(credential) = self else {
            return Ok(());
        };

        let check = ToolCommand::new("sudo")
            .args(["-S", "-p", "", "-v"])
            .stdin(format!("{}\n", credential.expose()));
        let output = runner.run(&check)?;
        if !output.is_success() {
            return Err(IsobootError::tool_failed(
                "sudo",
                output.status,
                "credential rejected",
            ));
        }
        tracing::debug!("Privileged credential accepted");
        Ok(())
    }
}

/// Runner that routes privileged commands through a [`PrivilegeGate`].
pub struct PrivilegedRunner<R: CommandRunner> {
    inner: R,
    gate: PrivilegeGate,
}

impl<R: CommandRunner> PrivilegedRunner<R> {
    pub fn new(inner: R, gate: PrivilegeGate) -> Self {
        Self { inner, gate }
    }

    pub fn gate(&self) -> &PrivilegeGate {
        &self.gate
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: CommandRunner> CommandRunner for PrivilegedRunner<R> {
    fn run(&self, command: &ToolCommand) -> IsobootResult<ToolOutput> {
        if command.privileged {
            tracing::info!(command = %command, "Running privileged tool");
        }
        self.inner.run(&self.gate.apply(command))
    }
}
