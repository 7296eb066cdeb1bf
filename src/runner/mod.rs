// src/runner/mod.rs

//! Low-level command execution strategies.
//!
//! Two independent strategies share the child supervision in `child`
//! (pid bookkeeping, chunked reads, kill on output overflow):
//!
//! - [`execute`](execute) — buffered: the full command line goes through a
//!   shell, output is collected until exit, nothing is streamed.
//! - [`spawn`](spawn) — streaming: direct exec, stdout buffered silently,
//!   stderr buffered and optionally relayed chunk-by-chunk as progress
//!   events.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::registry::ProcessRegistry;
use crate::types::{CorrelationId, ProgressEvent};

mod child;
pub mod execute;
pub mod spawn;

#[derive(Debug)]
pub struct CommandRunner {
    registry: Arc<ProcessRegistry>,
    max_output_bytes: usize,
}

impl CommandRunner {
    pub fn new(registry: Arc<ProcessRegistry>, max_output_bytes: usize) -> Self {
        Self {
            registry,
            max_output_bytes,
        }
    }

    /// Buffered execution through a shell. See [`execute::run_buffered`].
    pub async fn execute(
        &self,
        id: CorrelationId,
        directory: &Path,
        command: &Path,
        args: &[String],
    ) -> Result<String> {
        execute::run_buffered(
            &self.registry,
            self.max_output_bytes,
            id,
            directory,
            command,
            args,
        )
        .await
    }

    /// Streaming direct execution. See [`spawn::run_streaming`].
    pub async fn spawn(
        &self,
        id: CorrelationId,
        directory: &Path,
        command: &Path,
        args: &[String],
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Result<String> {
        spawn::run_streaming(
            &self.registry,
            self.max_output_bytes,
            id,
            directory,
            command,
            args,
            progress,
        )
        .await
    }
}

/// Strip exactly one trailing newline (`\n` or `\r\n`) from command output.
///
/// Output with no trailing newline is returned unchanged; inner newlines
/// are preserved.
pub(crate) fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::strip_trailing_newline;

    #[test]
    fn strips_exactly_one_newline() {
        assert_eq!(strip_trailing_newline("out\n".to_string()), "out");
        assert_eq!(strip_trailing_newline("out\n\n".to_string()), "out\n");
        assert_eq!(strip_trailing_newline("out\r\n".to_string()), "out");
        assert_eq!(strip_trailing_newline("out".to_string()), "out");
        assert_eq!(
            strip_trailing_newline(" M foo.txt\n?? bar.txt\n".to_string()),
            " M foo.txt\n?? bar.txt"
        );
    }
}
