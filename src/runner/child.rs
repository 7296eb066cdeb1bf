// src/runner/child.rs

//! Child-process supervision shared by both execution strategies.
//!
//! Spawns a prepared command, registers its pid, and drains stdout and
//! stderr as raw byte chunks. The moment either stream crosses the output
//! ceiling the child is killed instead of buffered further, so a runaway
//! process cannot grow memory unboundedly while it keeps running. Buffers
//! are concatenated raw and decoded once by the caller, so multi-byte
//! characters split across chunk boundaries never corrupt the final text.

use std::process::{ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, anyhow};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;
use tracing::warn;

use crate::errors::{CmdRelayError, Result};
use crate::registry::ProcessRegistry;
use crate::types::{CorrelationId, ProgressEvent};

use super::strip_trailing_newline;

pub(crate) struct ChildOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Run a prepared command to completion, enforcing the output ceiling
/// while the child is still alive.
///
/// `label` is the human-readable command line used in error messages.
pub(crate) async fn run_child(
    registry: &ProcessRegistry,
    max_output_bytes: usize,
    id: CorrelationId,
    mut cmd: Command,
    label: &str,
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> Result<ChildOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| CmdRelayError::Spawn(e.to_string()))?;

    if let Some(pid) = child.id() {
        registry.track(id, pid)?;
    }

    // Readers signal on this channel when a stream blows past the ceiling,
    // at which point the child is killed rather than buffered further.
    let (overflow_tx, mut overflow_rx) = mpsc::channel::<()>(2);

    let stdout = child.stdout.take();
    let stdout_task = tokio::spawn(read_stream(stdout, max_output_bytes, overflow_tx.clone()));

    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(read_stderr(
        stderr,
        max_output_bytes,
        overflow_tx.clone(),
        id,
        progress,
    ));

    // Holding a sender here keeps the channel open, so `recv` below can
    // only resolve on an actual overflow signal, never on reader EOF.
    let _overflow_guard = overflow_tx;

    let waited = tokio::select! {
        res = child.wait() => Some(res),
        _ = overflow_rx.recv() => None,
    };

    let status = match waited {
        Some(res) => {
            registry.untrack(id);
            Some(res.with_context(|| format!("waiting for command '{label}'"))?)
        }
        None => {
            if let Err(e) = child.kill().await {
                warn!(id, error = %e, "failed to kill child after output overflow");
            }
            registry.untrack(id);
            None
        }
    };

    let stdout_buf = stdout_task
        .await
        .map_err(|e| CmdRelayError::Other(anyhow!("stdout reader panicked: {e}")))?;
    let stderr_buf = stderr_task
        .await
        .map_err(|e| CmdRelayError::Other(anyhow!("stderr reader panicked: {e}")))?;

    let Some(status) = status else {
        return Err(anyhow!(
            "output of '{label}' exceeded the {max_output_bytes}-byte ceiling"
        )
        .into());
    };

    Ok(ChildOutput {
        status,
        stdout: stdout_buf,
        stderr: stderr_buf,
    })
}

/// Drain a pipe into a raw byte buffer, signalling overflow past `max`.
async fn read_stream<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    max: usize,
    overflow: mpsc::Sender<()>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut pipe) = pipe else {
        return buf;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > max {
                    let _ = overflow.send(()).await;
                    break;
                }
            }
            Err(_) => break,
        }
    }
    buf
}

/// Like [`read_stream`], but additionally relays each chunk as a progress
/// event when a sender is present.
async fn read_stderr(
    pipe: Option<ChildStderr>,
    max: usize,
    overflow: mpsc::Sender<()>,
    id: CorrelationId,
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut pipe) = pipe else {
        return buf;
    };
    let mut chunk = [0u8; 8192];
    let mut last_ts: u64 = 0;
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(tx) = &progress {
                    let message =
                        strip_trailing_newline(String::from_utf8_lossy(&chunk[..n]).into_owned());
                    // Stamps must strictly increase even when the clock
                    // hasn't ticked between chunks.
                    let ts = now_ms().max(last_ts + 1);
                    last_ts = ts;
                    let _ = tx
                        .send(ProgressEvent {
                            id,
                            timestamp_ms: ts,
                            message,
                        })
                        .await;
                }
                if buf.len() > max {
                    let _ = overflow.send(()).await;
                    break;
                }
            }
            Err(_) => break,
        }
    }
    buf
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
