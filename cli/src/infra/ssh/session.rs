//! Per-command session output collection.
//!
//! A pump reads frames off the session and feeds two in-memory pipes; two
//! drains copy those pipes into capture buffers and, optionally, local
//! mirrors. All three run concurrently and are joined before the result is
//! assembled, so a chatty stderr never stalls stdout or the other way round.

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};

use crate::domain::{CommandResult, ShellError};

const PIPE_CAPACITY: usize = 64 * 1024;
const READ_CHUNK: usize = 8 * 1024;

/// One unit of output from a running remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    ExitStatus(u32),
    ExitSignal(String),
}

/// A transient session running exactly one command.
#[allow(async_fn_in_trait)]
pub trait CommandSession {
    /// Next frame, or `None` once the remote side has closed the session.
    async fn next_frame(&mut self) -> Result<Option<Frame>, ShellError>;
    /// Close the session. Idempotent.
    async fn close(&mut self);
}

fn pipe_error(e: &std::io::Error) -> ShellError {
    ShellError::Execution {
        reason: format!("output pipe failed: {e}"),
    }
}

async fn drain<W: AsyncWrite + Unpin>(
    mut pipe: DuplexStream,
    mut mirror: Option<W>,
    label: &'static str,
) -> std::io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&chunk[..n]);
        if let Some(w) = mirror.as_mut() {
            let mirrored = async {
                w.write_all(&chunk[..n]).await?;
                w.flush().await
            }
            .await;
            if let Err(e) = mirrored {
                tracing::warn!(stream = label, error = %e, "local mirror failed, still capturing");
                mirror = None;
            }
        }
    }
    Ok(captured)
}

/// Run `session` to completion, capturing stdout and stderr separately and
/// mirroring each to its writer when one is given.
///
/// Returns only after the remote side closed the session and both streams
/// are fully drained. The session is closed on every path.
///
/// # Errors
///
/// Returns [`ShellError::Execution`] if the session fails mid-stream. A
/// non-zero exit is not an error here; see [`CommandResult::into_checked`].
pub async fn collect<S, O, E>(
    session: &mut S,
    stdout_mirror: Option<O>,
    stderr_mirror: Option<E>,
) -> Result<CommandResult, ShellError>
where
    S: CommandSession,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let (mut out_tx, out_rx) = tokio::io::duplex(PIPE_CAPACITY);
    let (mut err_tx, err_rx) = tokio::io::duplex(PIPE_CAPACITY);

    let frames = &mut *session;
    // Owns both writers, so the drains see EOF however the pump ends.
    let pump = async move {
        let mut exit_status = None;
        let mut exit_signal = None;
        while let Some(frame) = frames.next_frame().await? {
            match frame {
                Frame::Stdout(bytes) => out_tx.write_all(&bytes).await.map_err(|e| pipe_error(&e))?,
                Frame::Stderr(bytes) => err_tx.write_all(&bytes).await.map_err(|e| pipe_error(&e))?,
                Frame::ExitStatus(status) => exit_status = Some(status),
                Frame::ExitSignal(signal) => exit_signal = Some(signal),
            }
        }
        Ok::<_, ShellError>((exit_status, exit_signal))
    };

    let (pumped, stdout, stderr) = tokio::join!(
        pump,
        drain(out_rx, stdout_mirror, "stdout"),
        drain(err_rx, stderr_mirror, "stderr"),
    );
    session.close().await;

    let (exit_status, exit_signal) = pumped?;
    Ok(CommandResult {
        stdout: stdout.map_err(|e| pipe_error(&e))?,
        stderr: stderr.map_err(|e| pipe_error(&e))?,
        exit_status,
        exit_signal,
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
