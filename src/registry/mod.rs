// src/registry/mod.rs

//! Live process bookkeeping keyed by correlation id.
//!
//! The registry owns the id -> pid map. `track`/`untrack` are called by the
//! command runner around each child process; `kill_tree` is the timeout
//! path. Tokio tasks may touch the map from several threads, so it sits
//! behind a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::{debug, error};

use crate::errors::{CmdRelayError, Result};
use crate::types::CorrelationId;

pub mod mock;
pub mod table;

pub use table::{ProcessEntry, ProcessTable, SystemProcessTable};

#[derive(Debug)]
pub struct ProcessRegistry {
    records: Mutex<HashMap<CorrelationId, u32>>,
    table: Arc<dyn ProcessTable>,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::with_table(Arc::new(SystemProcessTable))
    }

    pub fn with_table(table: Arc<dyn ProcessTable>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            table,
        }
    }

    /// Record a live process under the given correlation id.
    ///
    /// A duplicate id means correlation-id issuance is broken upstream; it
    /// is logged loudly and reported, never silently overwritten.
    pub fn track(&self, id: CorrelationId, pid: u32) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&id) {
            error!(id, pid, "correlation id already tracked; issuance bug");
            return Err(CmdRelayError::DuplicateId(id));
        }
        records.insert(id, pid);
        debug!(id, pid, "tracking process");
        Ok(())
    }

    /// Remove the record for the id.
    ///
    /// Not an error if absent: a process may finish and be untracked
    /// concurrently with a kill request.
    pub fn untrack(&self, id: CorrelationId) {
        let removed = self.records.lock().unwrap().remove(&id);
        if removed.is_some() {
            debug!(id, "untracked process");
        }
    }

    /// Whether a record exists for the id (the id may not be reissued while
    /// this holds).
    pub fn is_tracked(&self, id: CorrelationId) -> bool {
        self.records.lock().unwrap().contains_key(&id)
    }

    /// Terminate the process for this id and all its descendants.
    ///
    /// Walks the OS process table once, collects descendants depth-first so
    /// that leaves come first, then terminates each descendant before
    /// finally signalling the root. Best effort: pids that already exited
    /// are skipped by the table implementation.
    pub async fn kill_tree(&self, id: CorrelationId) -> Result<()> {
        let pid = {
            let records = self.records.lock().unwrap();
            match records.get(&id) {
                Some(&pid) => pid,
                None => {
                    error!(id, "kill requested for unknown correlation id");
                    return Err(CmdRelayError::UnknownId(id));
                }
            }
        };

        let table = Arc::clone(&self.table);
        tokio::task::spawn_blocking(move || kill_tree_blocking(table.as_ref(), pid))
            .await
            .map_err(|e| CmdRelayError::Other(anyhow!("kill task panicked: {e}")))?
    }
}

fn kill_tree_blocking(table: &dyn ProcessTable, root: u32) -> Result<()> {
    let snapshot = table.snapshot()?;

    let mut order = Vec::new();
    collect_descendants(&snapshot, root, &mut order);
    order.push(root);

    debug!(root, ?order, "terminating process tree");

    for pid in order {
        table.terminate(pid)?;
    }
    Ok(())
}

/// Depth-first descendant collection: each child's own subtree is appended
/// before the child itself, so leaf processes appear first and the root is
/// signalled last by the caller.
fn collect_descendants(snapshot: &[ProcessEntry], parent: u32, out: &mut Vec<u32>) {
    for entry in snapshot.iter().filter(|e| e.ppid == parent) {
        collect_descendants(snapshot, entry.pid, out);
        out.push(entry.pid);
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockProcessTable;
    use super::*;

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = ProcessRegistry::with_table(Arc::new(MockProcessTable::new()));
        registry.track(7, 100).unwrap();
        let err = registry.track(7, 200).unwrap_err();
        assert!(matches!(err, CmdRelayError::DuplicateId(7)));
    }

    #[test]
    fn untrack_is_idempotent() {
        let registry = ProcessRegistry::with_table(Arc::new(MockProcessTable::new()));
        registry.track(1, 100).unwrap();
        registry.untrack(1);
        registry.untrack(1);
        assert!(!registry.is_tracked(1));
    }

    #[tokio::test]
    async fn kill_tree_unknown_id_errors() {
        let registry = ProcessRegistry::with_table(Arc::new(MockProcessTable::new()));
        let err = registry.kill_tree(99).await.unwrap_err();
        assert!(matches!(err, CmdRelayError::UnknownId(99)));
    }

    #[tokio::test]
    async fn kill_tree_terminates_descendants_before_root() {
        let table = Arc::new(MockProcessTable::new());
        // 100 -> 200 -> 300, and 100 -> 400. Unrelated: 500.
        table.add_process(100, 1);
        table.add_process(200, 100);
        table.add_process(300, 200);
        table.add_process(400, 100);
        table.add_process(500, 1);

        let registry = ProcessRegistry::with_table(table.clone());
        registry.track(1, 100).unwrap();
        registry.kill_tree(1).await.unwrap();

        let killed = table.killed();
        assert_eq!(killed, vec![300, 200, 400, 100]);

        let pos = |pid: u32| killed.iter().position(|&p| p == pid).unwrap();
        assert!(pos(300) < pos(200));
        assert!(pos(200) < pos(100));
        assert!(pos(400) < pos(100));
    }
}
