// src/runner/execute.rs

//! Buffered, shell-based execution strategy.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{CmdRelayError, Result};
use crate::registry::ProcessRegistry;
use crate::types::CorrelationId;

use super::child::run_child;
use super::strip_trailing_newline;

/// Run the full command line through a shell, buffering all output until
/// the process exits. The output ceiling is enforced while the child is
/// still running; crossing it kills the process.
///
/// The program path is quoted as a single shell token; arguments are joined
/// raw, so callers keep access to shell features but own the escaping of
/// any metacharacters.
///
/// Zero exit returns stdout, non-zero exit fails with stderr; either way
/// exactly one trailing newline is stripped.
pub(crate) async fn run_buffered(
    registry: &ProcessRegistry,
    max_output_bytes: usize,
    id: CorrelationId,
    directory: &Path,
    command: &Path,
    args: &[String],
) -> Result<String> {
    let command_line = join_command_line(command, args);

    info!(id, cmd = %command_line, "starting buffered command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&command_line);
        c
    };
    cmd.current_dir(directory);

    let output = run_child(registry, max_output_bytes, id, cmd, &command_line, None).await?;

    let code = output.status.code().unwrap_or(-1);
    debug!(id, code, "buffered command exited");

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

/// Quote the program path as one shell token and append the raw argument
/// string.
pub(crate) fn join_command_line(command: &Path, args: &[String]) -> String {
    let quoted = shell_words::quote(&command.to_string_lossy()).into_owned();
    if args.is_empty() {
        quoted
    } else {
        format!("{} {}", quoted, args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn quotes_only_the_program_path() {
        let line = join_command_line(
            &PathBuf::from("/opt/my tools/git"),
            &["status".to_string(), "--porcelain".to_string()],
        );
        assert_eq!(line, "'/opt/my tools/git' status --porcelain");
    }

    #[test]
    fn plain_path_is_left_unquoted() {
        let line = join_command_line(&PathBuf::from("/usr/bin/git"), &[]);
        assert_eq!(line, "/usr/bin/git");
    }
}
