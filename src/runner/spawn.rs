// src/runner/spawn.rs

//! Streaming, direct-exec execution strategy.
//!
//! No shell is involved: the program runs directly with an argument
//! vector. Stdout is buffered silently; stderr is the only channel with
//! incremental feedback, relayed chunk-by-chunk as [`ProgressEvent`]s when
//! progress is requested.

use std::path::Path;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{CmdRelayError, Result};
use crate::registry::ProcessRegistry;
use crate::types::{CorrelationId, ProgressEvent};

use super::child::run_child;
use super::strip_trailing_newline;

pub(crate) async fn run_streaming(
    registry: &ProcessRegistry,
    max_output_bytes: usize,
    id: CorrelationId,
    directory: &Path,
    command: &Path,
    args: &[String],
    progress: Option<mpsc::Sender<ProgressEvent>>,
) -> Result<String> {
    info!(id, cmd = %command.display(), ?args, "starting streamed command");

    let mut cmd = Command::new(command);
    cmd.args(args).current_dir(directory);

    let label = command.display().to_string();
    let output = run_child(registry, max_output_bytes, id, cmd, &label, progress).await?;

    let code = output.status.code().unwrap_or(-1);
    debug!(id, code, "streamed command exited");

    if output.status.success() {
        Ok(strip_trailing_newline(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    } else {
        Err(CmdRelayError::NonZeroExit {
            code,
            stderr: strip_trailing_newline(String::from_utf8_lossy(&output.stderr).into_owned()),
        })
    }
}
