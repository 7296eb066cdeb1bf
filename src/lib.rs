// src/lib.rs

pub mod bridge;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::queue::CommandQueue;
use crate::types::CommandOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - the command queue (which lazily connects the worker bridge)
/// - a progress printer for streamed commands
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_and_validate(Path::new(&args.config))?;
    let root_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let (queue, mut progress_rx) = CommandQueue::new(settings, root_dir);

    // Print progress lines to stderr as they arrive; stdout stays reserved
    // for the final command output.
    tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            eprintln!("[{}] {}", event.id, event.message);
        }
        debug!("progress channel closed");
    });

    let mut options = CommandOptions::default();
    if let Some(ref cwd) = args.cwd {
        options.cwd = Some(PathBuf::from(cwd));
    }
    if let Some(ref timeout) = args.timeout {
        options.timeout = timeout.parse().map_err(|e: String| anyhow!(e))?;
    }
    options.watch_progress = args.progress;

    let arg_refs: Vec<&str> = args.args.iter().map(String::as_str).collect();

    let output = if args.spawn {
        queue.spawn(&args.command, &arg_refs, options).await?
    } else {
        queue.run(&args.command, &arg_refs, options).await?
    };

    println!("{output}");
    Ok(())
}
