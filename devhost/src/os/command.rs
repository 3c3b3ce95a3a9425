//! Running external commands, optionally with elevated privileges.

use std::process::Command;

use devhost_shared::errors::{DevhostError, DevhostResult};

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands on behalf of preflight checks.
///
/// A command exiting non-zero is an error carrying its stderr.
pub trait CommandRunner {
    fn run(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput>;

    /// Run with `LC_ALL=C` so output can be matched textually.
    fn run_with_default_locale(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput>;

    /// Run with elevated privileges. `reason` describes the action to the user.
    fn run_with_privilege(
        &self,
        reason: &str,
        command: &str,
        args: &[&str],
    ) -> DevhostResult<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`, elevating through `sudo`.
#[derive(Clone, Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn execute(mut cmd: Command, shown: String) -> DevhostResult<CommandOutput> {
        tracing::debug!(command = %shown, "Running command");

        let output = cmd.output().map_err(|e| DevhostError::Command {
            command: shown.clone(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::debug!(command = %shown, status = ?output.status.code(), stderr = %stderr.trim(), "Command failed");
            let message = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(DevhostError::Command {
                command: shown,
                message,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn display_command(command: &str, args: &[&str]) -> String {
    std::iter::once(command)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        Self::execute(cmd, display_command(command, args))
    }

    fn run_with_default_locale(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args).env("LC_ALL", "C").env("LANG", "C");
        Self::execute(cmd, display_command(command, args))
    }

    fn run_with_privilege(
        &self,
        reason: &str,
        command: &str,
        args: &[&str],
    ) -> DevhostResult<CommandOutput> {
        tracing::info!("Using root access: {}", reason);
        let mut cmd = Command::new("sudo");
        cmd.arg(command).args(args);
        Self::execute(cmd, format!("sudo {}", display_command(command, args)))
    }
}
