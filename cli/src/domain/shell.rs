//! Remote command result type.

use crate::domain::error::ShellError;

/// Captured output of one completed remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Every byte the remote process wrote to stdout.
    pub stdout: Vec<u8>,
    /// Every byte the remote process wrote to stderr.
    pub stderr: Vec<u8>,
    /// Exit status reported by the server, if it reported one.
    pub exit_status: Option<u32>,
    /// Signal name when the remote process was killed by a signal.
    pub exit_signal: Option<String>,
}

impl CommandResult {
    /// Stdout decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Turn a failed remote exit into a `ShellError`.
    ///
    /// A missing exit status is accepted: some servers close the channel
    /// without reporting one.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Execution`] when the process was killed by a
    /// signal and [`ShellError::ExitStatus`] for a non-zero exit.
    pub fn into_checked(self) -> Result<Self, ShellError> {
        if let Some(signal) = &self.exit_signal {
            return Err(ShellError::Execution {
                reason: format!("terminated by signal {signal}: {}", self.stderr_lossy().trim()),
            });
        }
        match self.exit_status {
            Some(status) if status != 0 => Err(ShellError::ExitStatus {
                status,
                stderr: self.stderr_lossy(),
                stdout: self.stdout,
            }),
            _ => Ok(self),
        }
    }
}
