// src/types.rs

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Integer token linking a queued request to exactly one live OS process.
///
/// Issued by the queue, monotonically increasing, wrapping to 0 before it
/// would exceed `u32::MAX`. An id is only reassigned after the process it
/// identified has been untracked from the registry.
pub type CorrelationId = u32;

/// Which low-level execution strategy a request uses.
///
/// The two strategies deliberately differ in shell interpretation:
///
/// - `Execute` runs the full command line through a shell (`sh -c` /
///   `cmd /C`). Only the program path is quoted; arguments are joined raw,
///   so callers may use shell features (pipes, redirection) but must escape
///   metacharacters themselves.
/// - `Spawn` launches the program directly with an argument vector. No shell
///   is involved and no quoting is required or applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMethod {
    Execute,
    Spawn,
}

/// Timeout policy for a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Use the configured default period.
    Default,
    /// Never time out.
    Disabled,
    /// Time out after this many seconds.
    AfterSecs(u64),
}

impl Timeout {
    /// Resolve the policy to a concrete period, if any.
    pub fn period(self, default_secs: u64) -> Option<Duration> {
        match self {
            Timeout::Default => Some(Duration::from_secs(default_secs)),
            Timeout::Disabled => None,
            Timeout::AfterSecs(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Default
    }
}

impl FromStr for Timeout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "false" | "none" | "off" => Ok(Timeout::Disabled),
            "default" => Ok(Timeout::Default),
            other => other
                .parse::<u64>()
                .map(Timeout::AfterSecs)
                .map_err(|_| format!("invalid timeout: {other} (expected seconds or \"false\")")),
        }
    }
}

/// Async predicate consulted when a timeout period expires.
///
/// Returning `true` defers the timeout for another full period; `false`
/// lets the command be killed.
pub type TimeoutCheck = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Per-call configuration, validated at the queue boundary.
#[derive(Clone, Default)]
pub struct CommandOptions {
    /// Working directory; falls back to the queue's configured root.
    pub cwd: Option<PathBuf>,
    /// Timeout policy (seconds); `Disabled` skips arming the timer entirely.
    pub timeout: Timeout,
    /// Suppress error logging when this command times out (caller expects a
    /// possible hang).
    pub timeout_expected: bool,
    /// Optional recheck predicate, see [`TimeoutCheck`].
    pub timeout_check: Option<TimeoutCheck>,
    /// Stream stderr chunks as progress events. Forced on when the args
    /// contain `--progress`.
    pub watch_progress: bool,
}

impl fmt::Debug for CommandOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOptions")
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .field("timeout_expected", &self.timeout_expected)
            .field("has_timeout_check", &self.timeout_check.is_some())
            .field("watch_progress", &self.watch_progress)
            .finish()
    }
}

/// Incremental feedback from a streaming (`spawn`) command.
///
/// Emitted once per stderr chunk, in production order, tagged with the
/// originating correlation id. Timestamps are wall-clock milliseconds and
/// strictly increase per id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub id: CorrelationId,
    pub timestamp_ms: u64,
    pub message: String,
}
