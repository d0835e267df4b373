//! In-memory policy store for testing

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::broadcast;
use warden_util::{AppId, MonitoredIdentity};

use crate::{PolicyError, PolicyResult, PolicyStore, PolicyTable};

/// In-process policy store used by unit and integration tests.
///
/// `push_table` simulates a remote push; write-backs are recorded so tests
/// can assert exactly which blocked flags the engine persisted. Failure
/// toggles simulate transient store outages.
pub struct MemoryPolicyStore {
    table: Mutex<PolicyTable>,
    push_tx: broadcast::Sender<PolicyTable>,

    /// Write-backs received via `set_blocked`, in order
    pub write_backs: Mutex<Vec<(AppId, bool)>>,

    /// Configure `fetch` to fail
    pub fail_fetch: Mutex<bool>,

    /// Configure `set_blocked` to fail
    pub fail_write: Mutex<bool>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(PolicyTable::new()),
            push_tx: broadcast::channel(16).0,
            write_backs: Mutex::new(Vec::new()),
            fail_fetch: Mutex::new(false),
            fail_write: Mutex::new(false),
        }
    }

    pub fn with_table(table: PolicyTable) -> Self {
        let store = Self::new();
        *store.table.lock().unwrap() = table;
        store
    }

    /// Replace the table and publish it to subscribers, simulating a remote
    /// policy push.
    pub fn push_table(&self, table: PolicyTable) {
        *self.table.lock().unwrap() = table.clone();
        let _ = self.push_tx.send(table);
    }

    /// Write-backs recorded so far
    pub fn recorded_write_backs(&self) -> Vec<(AppId, bool)> {
        self.write_backs.lock().unwrap().clone()
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn fetch(&self, _identity: &MonitoredIdentity) -> PolicyResult<PolicyTable> {
        if *self.fail_fetch.lock().unwrap() {
            return Err(PolicyError::Unavailable("mock fetch failure".into()));
        }
        Ok(self.table.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<PolicyTable> {
        self.push_tx.subscribe()
    }

    async fn set_blocked(
        &self,
        _identity: &MonitoredIdentity,
        app_id: &AppId,
        blocked: bool,
    ) -> PolicyResult<()> {
        if *self.fail_write.lock().unwrap() {
            return Err(PolicyError::Unavailable("mock write failure".into()));
        }

        self.write_backs
            .lock()
            .unwrap()
            .push((app_id.clone(), blocked));

        let table = {
            let mut table = self.table.lock().unwrap();
            let mut entry = table
                .get(app_id)
                .cloned()
                .unwrap_or_else(|| crate::PolicyEntry::new(app_id.as_str()));
            entry.blocked = blocked;
            table.insert(entry);
            table.clone()
        };

        let _ = self.push_tx.send(table);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
