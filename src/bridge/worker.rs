// src/bridge/worker.rs

//! The worker side of the boundary: the loop that is allowed to spawn OS
//! processes.
//!
//! Each call is handled on its own Tokio task so that a `Kill` can overtake
//! a still-running `Spawn` or `Execute` for the same correlation id. The
//! queue guarantees at most one command in flight, so concurrency here is
//! kill-vs-command only.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::errors::Result;
use crate::registry::ProcessRegistry;
use crate::resolver::ExecutableResolver;
use crate::runner::CommandRunner;
use crate::types::ProgressEvent;

use super::{BridgeCall, BridgeReply, Envelope};

struct WorkerContext {
    resolver: ExecutableResolver,
    registry: Arc<ProcessRegistry>,
    runner: CommandRunner,
    progress_tx: mpsc::Sender<ProgressEvent>,
}

/// Spawn the background worker loop and return its request sender.
pub(crate) fn spawn_worker(
    settings: Settings,
    progress_tx: mpsc::Sender<ProgressEvent>,
) -> mpsc::Sender<Envelope> {
    let (tx, mut rx) = mpsc::channel::<Envelope>(32);

    tokio::spawn(async move {
        info!("worker loop started");

        let registry = Arc::new(ProcessRegistry::new());
        let ctx = Arc::new(WorkerContext {
            resolver: ExecutableResolver::new(),
            runner: CommandRunner::new(Arc::clone(&registry), settings.max_output_bytes()),
            registry,
            progress_tx,
        });

        while let Some(envelope) = rx.recv().await {
            debug!(call = ?envelope.call, "worker received call");
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let result = handle_call(&ctx, envelope.call).await;
                let _ = envelope.reply.send(result);
            });
        }

        info!("worker loop finished (channel closed)");
    });

    tx
}

/// Dispatch one call: resolve the executable where the method requires it,
/// then delegate to the runner / registry.
async fn handle_call(ctx: &WorkerContext, call: BridgeCall) -> Result<BridgeReply> {
    match call {
        BridgeCall::Execute {
            id,
            directory,
            command,
            args,
        } => {
            let resolved = ctx.resolver.resolve(&directory, &command)?;
            let output = ctx.runner.execute(id, &directory, &resolved, &args).await?;
            Ok(BridgeReply::Output(output))
        }

        BridgeCall::Spawn {
            id,
            directory,
            command,
            args,
            watch_progress,
        } => {
            let resolved = ctx.resolver.resolve(&directory, &command)?;
            let progress = watch_progress.then(|| ctx.progress_tx.clone());
            let output = ctx
                .runner
                .spawn(id, &directory, &resolved, &args, progress)
                .await?;
            Ok(BridgeReply::Output(output))
        }

        BridgeCall::Kill { id } => {
            ctx.registry.kill_tree(id).await?;
            Ok(BridgeReply::Killed)
        }

        BridgeCall::Which { directory, command } => {
            let resolved = ctx.resolver.resolve(&directory, &command)?;
            Ok(BridgeReply::Path(resolved))
        }

        BridgeCall::PathExists { directory, path } => {
            let full = if path.is_absolute() {
                path
            } else {
                directory.join(path)
            };
            Ok(BridgeReply::Exists(full.exists()))
        }
    }
}
