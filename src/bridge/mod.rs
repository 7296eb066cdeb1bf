// src/bridge/mod.rs

//! Cross-process command dispatch boundary.
//!
//! The queue never talks to the runner directly; it goes through a
//! [`Bridge`], an async request/response surface carrying
//! [`BridgeCall`] envelopes with per-call replies. Production code uses
//! [`WorkerBridge`], which owns a background worker loop (the side that is
//! actually permitted to spawn OS processes); tests can substitute their
//! own `Bridge` implementation that never touches real processes.
//!
//! Progress events produced during `spawn` are relayed over a dedicated
//! channel handed out at connect time, un-batched and in production order,
//! each tagged with its correlation id.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::config::Settings;
use crate::errors::{CmdRelayError, Result};
use crate::types::{CorrelationId, ProgressEvent};

pub mod worker;

/// One request across the boundary.
#[derive(Debug, Clone)]
pub enum BridgeCall {
    /// Buffered shell-based execution.
    Execute {
        id: CorrelationId,
        directory: PathBuf,
        command: String,
        args: Vec<String>,
    },
    /// Direct exec with optional progress streaming.
    Spawn {
        id: CorrelationId,
        directory: PathBuf,
        command: String,
        args: Vec<String>,
        watch_progress: bool,
    },
    /// Best-effort kill of the process tree for a live correlation id.
    Kill { id: CorrelationId },
    /// Executable resolution only; nothing is spawned. Relative commands
    /// with a separator resolve against `directory`.
    Which { directory: PathBuf, command: String },
    /// Filesystem existence check; relative paths resolve against
    /// `directory`.
    PathExists { directory: PathBuf, path: PathBuf },
}

/// Successful reply to a [`BridgeCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Output(String),
    Path(PathBuf),
    Exists(bool),
    Killed,
}

/// Queue-side view of the boundary.
///
/// Failures of the channel itself surface as
/// [`CmdRelayError::Boundary`], distinct from a command failing: a
/// boundary error means no result was obtained at all.
pub trait Bridge: Send + Sync {
    fn call(&self, call: BridgeCall)
    -> Pin<Box<dyn Future<Output = Result<BridgeReply>> + Send + '_>>;
}

pub(crate) struct Envelope {
    pub(crate) call: BridgeCall,
    pub(crate) reply: oneshot::Sender<Result<BridgeReply>>,
}

/// Production bridge: forwards calls to a background worker loop.
#[derive(Debug, Clone)]
pub struct WorkerBridge {
    tx: mpsc::Sender<Envelope>,
}

impl WorkerBridge {
    /// Establish the boundary: spawns the worker loop and returns the
    /// bridge plus the receiving end of the progress relay.
    pub fn connect(settings: &Settings) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);
        let tx = worker::spawn_worker(settings.clone(), progress_tx);
        (Self { tx }, progress_rx)
    }
}

impl Bridge for WorkerBridge {
    fn call(
        &self,
        call: BridgeCall,
    ) -> Pin<Box<dyn Future<Output = Result<BridgeReply>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            let (reply_tx, reply_rx) = oneshot::channel();
            tx.send(Envelope {
                call,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CmdRelayError::Boundary("worker channel closed".to_string()))?;

            reply_rx
                .await
                .map_err(|_| CmdRelayError::Boundary("worker dropped the reply".to_string()))?
        })
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("call", &self.call)
            .finish_non_exhaustive()
    }
}
