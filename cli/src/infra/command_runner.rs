//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::application::ports::CommandRunner;

/// Default timeout for short `aws` CLI calls (describe, create, delete).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for `aws ec2 wait ...`, which polls on the CLI side.
pub const WAITER_TIMEOUT: Duration = Duration::from_secs(600);

/// Production `CommandRunner`, uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// `tokio::time::timeout` around `.output().await` drops the future but can
/// leave the OS process running on Windows, so the timeout branch kills the
/// child explicitly.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(program, ?args, "running");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    read_all(stdout_handle),
                    read_all(stderr_handle),
                );
                let status = status.with_context(|| format!("waiting for {program}"))?;
                tracing::debug!(program, code = status.code(), "finished");
                Ok(Output { status, stdout, stderr })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_both_streams() {
        let runner = TokioCommandRunner::default();
        let out = runner
            .run("sh", &["-c", "printf out; printf err >&2; exit 3"])
            .await
            .expect("run");
        assert_eq!(out.stdout, b"out");
        assert_eq!(out.stderr, b"err");
        assert_eq!(out.status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_run_with_timeout_kills_slow_process() {
        let runner = TokioCommandRunner::default();
        let err = runner
            .run_with_timeout("sleep", &["5"], Duration::from_millis(100))
            .await
            .expect_err("expected timeout");
        assert!(err.to_string().contains("timed out"), "got {err}");
    }

    #[tokio::test]
    async fn test_run_missing_program_fails_to_spawn() {
        let runner = TokioCommandRunner::default();
        let err = runner
            .run("ec2-k3s-no-such-program", &[])
            .await
            .expect_err("expected spawn failure");
        assert!(err.to_string().contains("failed to spawn"));
    }
}
