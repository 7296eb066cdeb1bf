// src/registry/table.rs

//! OS process-table access behind a trait.
//!
//! `kill_tree` needs two primitives: a snapshot of (pid, ppid) pairs to
//! discover descendants, and a way to terminate a single pid. The real
//! implementation shells out to platform utilities; tests use
//! [`mock::MockProcessTable`](super::mock::MockProcessTable) to verify
//! termination ordering without touching real processes.

use std::fmt::Debug;
use std::process::Command;

use anyhow::{Context, anyhow};

use crate::errors::Result;

/// One row of the OS process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
}

/// Abstract process-table interface.
pub trait ProcessTable: Send + Sync + Debug {
    /// Snapshot of the full process table. Taken once per kill request; no
    /// incremental tracking.
    fn snapshot(&self) -> Result<Vec<ProcessEntry>>;

    /// Terminate a single process. A process that already exited is not an
    /// error; the kill race with natural exit is benign.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Implementation backed by the host OS.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessTable;

#[cfg(unix)]
impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        let output = Command::new("ps")
            .args(["-Ao", "pid=,ppid="])
            .output()
            .context("running ps for process-table snapshot")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ps exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )
            .into());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(parse_pid_ppid_lines(&text))
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        // SIGKILL, matching the "kill and move on" contract. ESRCH means the
        // process exited before the signal arrived.
        let ret = unsafe { libc::kill(pid as i32, libc::SIGKILL) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err.into());
            }
        }
        Ok(())
    }
}

#[cfg(windows)]
impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        let output = Command::new("wmic")
            .args(["process", "get", "ProcessId,ParentProcessId"])
            .output()
            .context("running wmic for process-table snapshot")?;

        if !output.status.success() {
            return Err(anyhow!(
                "wmic exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )
            .into());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        // wmic prints "ParentProcessId  ProcessId" columns; reuse the pair
        // parser with the columns swapped.
        Ok(parse_pid_ppid_lines(&text)
            .into_iter()
            .map(|e| ProcessEntry {
                pid: e.ppid,
                ppid: e.pid,
            })
            .collect())
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        let output = Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .output()
            .context("running taskkill")?;
        // A process that is already gone makes taskkill fail; treat that as
        // the benign race it is.
        let _ = output;
        Ok(())
    }
}

/// Parse whitespace-separated `<a> <b>` integer pairs, one per line,
/// skipping anything that does not parse (headers, blank lines).
fn parse_pid_ppid_lines(text: &str) -> Vec<ProcessEntry> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let pid = fields.next()?.parse().ok()?;
            let ppid = fields.next()?.parse().ok()?;
            Some(ProcessEntry { pid, ppid })
        })
        .collect()
}
