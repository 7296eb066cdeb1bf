// src/registry/mock.rs

use std::sync::{Arc, Mutex};

use crate::errors::Result;

use super::table::{ProcessEntry, ProcessTable};

/// In-memory process table for tests.
///
/// Holds a fixed set of (pid, ppid) rows and records every `terminate`
/// call in order, so tests can assert descendant-before-root ordering.
#[derive(Debug, Clone, Default)]
pub struct MockProcessTable {
    entries: Arc<Mutex<Vec<ProcessEntry>>>,
    killed: Arc<Mutex<Vec<u32>>>,
}

impl MockProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&self, pid: u32, ppid: u32) {
        self.entries.lock().unwrap().push(ProcessEntry { pid, ppid });
    }

    /// Pids passed to `terminate`, in call order.
    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap().clone()
    }
}

impl ProcessTable for MockProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }
}
