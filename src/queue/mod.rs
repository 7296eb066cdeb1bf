// src/queue/mod.rs

//! The caller-facing command queue.
//!
//! All requests are serialized into a strict one-at-a-time execution
//! order by a single dispatcher task: an entry is not dispatched until the
//! previous entry's result has been settled, so at most one OS process is
//! ever live and correlation-id bookkeeping stays trivial. The dispatcher
//! also owns connection establishment to the worker (lazy, idempotent),
//! correlation-id issuance, timeout supervision, and sanitization of
//! everything that leaves the queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::bridge::{Bridge, BridgeCall, BridgeReply, WorkerBridge};
use crate::config::Settings;
use crate::errors::{CmdRelayError, Result};
use crate::types::{CommandOptions, CorrelationId, ExecutionMethod, ProgressEvent};

pub mod sanitize;
pub mod timeout;

use timeout::{Supervised, supervise};

/// Produces a connected [`Bridge`] on demand. Called at most once per
/// queue lifetime under normal operation; called again only after a
/// failed attempt.
pub type Connector = Box<dyn FnMut() -> Result<Arc<dyn Bridge>> + Send + 'static>;

struct QueueEntry {
    method: ExecutionMethod,
    command: String,
    args: Vec<String>,
    options: CommandOptions,
    reply: oneshot::Sender<Result<String>>,
}

#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<QueueEntry>,
}

impl CommandQueue {
    /// Build a queue backed by a real [`WorkerBridge`].
    ///
    /// Returns the queue plus the receiving end of the progress relay;
    /// progress events arrive in production order, tagged with their
    /// correlation id.
    pub fn new(
        settings: Settings,
        root_dir: impl Into<PathBuf>,
    ) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);

        let connect_settings = settings.clone();
        let connector: Connector = Box::new(move || {
            let (bridge, mut bridge_progress) = WorkerBridge::connect(&connect_settings);
            let out = progress_tx.clone();
            // Relay progress from the boundary outward, preserving order.
            tokio::spawn(async move {
                while let Some(event) = bridge_progress.recv().await {
                    if out.send(event).await.is_err() {
                        break;
                    }
                }
            });
            Ok(Arc::new(bridge) as Arc<dyn Bridge>)
        });

        (
            Self::with_connector(settings, root_dir.into(), connector),
            progress_rx,
        )
    }

    /// Build a queue over a caller-supplied connector (tests use this to
    /// substitute a fake bridge).
    pub fn with_connector(settings: Settings, root_dir: PathBuf, connector: Connector) -> Self {
        let (tx, rx) = mpsc::channel::<QueueEntry>(64);
        tokio::spawn(dispatch_loop(settings, root_dir, connector, rx));
        Self { tx }
    }

    /// Enqueue a buffered (shell-based) command.
    ///
    /// The returned future settles only once the request has been
    /// dispatched, executed and its result sanitized. Requests settle in
    /// enqueue order regardless of how many callers are waiting.
    pub async fn run(
        &self,
        command: &str,
        args: &[&str],
        options: CommandOptions,
    ) -> Result<String> {
        self.enqueue(ExecutionMethod::Execute, command, args, options)
            .await
    }

    /// Enqueue a streaming (direct-exec) command.
    pub async fn spawn(
        &self,
        command: &str,
        args: &[&str],
        options: CommandOptions,
    ) -> Result<String> {
        self.enqueue(ExecutionMethod::Spawn, command, args, options)
            .await
    }

    async fn enqueue(
        &self,
        method: ExecutionMethod,
        command: &str,
        args: &[&str],
        options: CommandOptions,
    ) -> Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let entry = QueueEntry {
            method,
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            options,
            reply: reply_tx,
        };

        self.tx
            .send(entry)
            .await
            .map_err(|_| CmdRelayError::Boundary("command queue closed".to_string()))?;

        reply_rx
            .await
            .map_err(|_| CmdRelayError::Boundary("dispatcher dropped the reply".to_string()))?
    }
}

/// Serial dispatcher: one entry at a time, FIFO.
async fn dispatch_loop(
    settings: Settings,
    root_dir: PathBuf,
    mut connector: Connector,
    mut rx: mpsc::Receiver<QueueEntry>,
) {
    info!("command queue dispatcher started");

    let mut bridge: Option<Arc<dyn Bridge>> = None;
    let mut next_id: CorrelationId = 0;

    while let Some(entry) = rx.recv().await {
        // Dispatching: establish the connection once; every later entry
        // observes the already-connected bridge.
        let connected = match &bridge {
            Some(b) => Arc::clone(b),
            None => match connector() {
                Ok(b) => {
                    bridge = Some(Arc::clone(&b));
                    b
                }
                Err(e) => {
                    let _ = entry.reply.send(Err(sanitize::redact_error(e)));
                    continue;
                }
            },
        };

        let id = issue_id(&mut next_id);

        let result = run_entry(&settings, &root_dir, connected.as_ref(), id, &entry).await;

        let result = match result {
            Ok(output) => Ok(sanitize::redact_credentials(&output)),
            Err(e) => Err(sanitize::redact_error(e)),
        };
        let _ = entry.reply.send(result);
    }

    info!("command queue dispatcher finished (channel closed)");
}

/// Issue the next correlation id, wrapping to 0 before exceeding
/// `u32::MAX`.
fn issue_id(next: &mut CorrelationId) -> CorrelationId {
    let id = *next;
    *next = if *next == u32::MAX { 0 } else { *next + 1 };
    id
}

/// Execute one entry: build the bridge call, supervise it against the
/// timeout policy, kill on expiry.
async fn run_entry(
    settings: &Settings,
    root_dir: &Path,
    bridge: &dyn Bridge,
    id: CorrelationId,
    entry: &QueueEntry,
) -> Result<String> {
    let cwd = entry
        .options
        .cwd
        .clone()
        .unwrap_or_else(|| root_dir.to_path_buf());
    let directory = PathBuf::from(sanitize::to_native_separators(&cwd.to_string_lossy()));

    let command_line = if entry.args.is_empty() {
        entry.command.clone()
    } else {
        format!("{} {}", entry.command, entry.args.join(" "))
    };

    if settings.debug {
        debug!(id, cmd = %command_line, "dispatching command");
    }

    let watch_progress =
        entry.options.watch_progress || entry.args.iter().any(|a| a == "--progress");

    let call = match entry.method {
        ExecutionMethod::Execute => BridgeCall::Execute {
            id,
            directory,
            command: entry.command.clone(),
            args: entry.args.clone(),
        },
        ExecutionMethod::Spawn => BridgeCall::Spawn {
            id,
            directory,
            command: entry.command.clone(),
            args: entry.args.clone(),
            watch_progress,
        },
    };

    let period = entry
        .options
        .timeout
        .period(settings.default_timeout_secs);

    let supervised = supervise(
        bridge.call(call),
        period,
        entry.options.timeout_check.clone(),
    )
    .await;

    match supervised {
        Supervised::Completed(reply) => match reply? {
            BridgeReply::Output(output) => Ok(output),
            other => Err(CmdRelayError::Boundary(format!(
                "unexpected reply to command call: {other:?}"
            ))),
        },
        Supervised::TimedOut => {
            if entry.options.timeout_expected {
                debug!(id, cmd = %command_line, "expected timeout reached; killing process tree");
            } else {
                error!(id, cmd = %command_line, "command timed out; killing process tree");
            }

            // Best effort: the process may already have exited naturally.
            if let Err(e) = bridge.call(BridgeCall::Kill { id }).await {
                debug!(id, error = %e, "kill after timeout failed");
            }

            Err(CmdRelayError::Timeout { command_line })
        }
    }
}
