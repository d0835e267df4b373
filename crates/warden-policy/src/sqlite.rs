//! SQLite-backed policy store

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use warden_util::{AppId, MonitoredIdentity};

use crate::{PolicyEntry, PolicyResult, PolicyStore, PolicyTable};

/// Capacity of the push channel. A lagged subscriber re-fetches, so a small
/// buffer is enough.
const PUSH_CHANNEL_CAPACITY: usize = 16;

/// Local SQLite-backed policy store.
///
/// Entries are keyed by the parent/child pairing plus the app identifier.
/// Every successful write publishes the refreshed full table to
/// subscribers.
pub struct SqlitePolicyStore {
    conn: Mutex<Connection>,
    push_tx: broadcast::Sender<PolicyTable>,
}

impl SqlitePolicyStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            push_tx: broadcast::channel(PUSH_CHANNEL_CAPACITY).0,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> PolicyResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            push_tx: broadcast::channel(PUSH_CHANNEL_CAPACITY).0,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> PolicyResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS policy_entries (
                parent_id TEXT NOT NULL,
                child_id TEXT NOT NULL,
                app_id TEXT NOT NULL,
                blocked INTEGER NOT NULL DEFAULT 0,
                time_limit_seconds INTEGER,
                PRIMARY KEY (parent_id, child_id, app_id)
            );

            CREATE INDEX IF NOT EXISTS idx_policy_identity
                ON policy_entries(parent_id, child_id);
            "#,
        )?;

        debug!("Policy store schema initialized");
        Ok(())
    }

    fn load_table(&self, identity: &MonitoredIdentity) -> PolicyResult<PolicyTable> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT app_id, blocked, time_limit_seconds FROM policy_entries
             WHERE parent_id = ? AND child_id = ?",
        )?;

        let rows = stmt.query_map(params![identity.parent_id, identity.child_id], |row| {
            let app_id: String = row.get(0)?;
            let blocked: bool = row.get(1)?;
            let time_limit_seconds: Option<i64> = row.get(2)?;
            Ok((app_id, blocked, time_limit_seconds))
        })?;

        let mut table = PolicyTable::new();
        for row in rows {
            let (app_id, blocked, time_limit_seconds) = row?;
            table.insert(PolicyEntry {
                app_id: AppId::new(app_id),
                blocked,
                time_limit_seconds: time_limit_seconds.map(|s| s.max(0) as u64),
            });
        }

        Ok(table)
    }

    /// Publish the current table to subscribers. No-op when nobody listens.
    fn publish(&self, identity: &MonitoredIdentity) -> PolicyResult<()> {
        let table = self.load_table(identity)?;
        let _ = self.push_tx.send(table);
        Ok(())
    }

    /// Insert or replace the full entry for an app. This is the write path
    /// used by policy tooling; the engine itself only flips the blocked
    /// flag via `set_blocked`.
    pub fn upsert_entry(
        &self,
        identity: &MonitoredIdentity,
        entry: &PolicyEntry,
    ) -> PolicyResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                r#"
                INSERT INTO policy_entries (parent_id, child_id, app_id, blocked, time_limit_seconds)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(parent_id, child_id, app_id)
                DO UPDATE SET blocked = excluded.blocked,
                              time_limit_seconds = excluded.time_limit_seconds
                "#,
                params![
                    identity.parent_id,
                    identity.child_id,
                    entry.app_id.as_str(),
                    entry.blocked,
                    entry.time_limit_seconds.map(|s| s as i64),
                ],
            )?;
        }

        debug!(app_id = %entry.app_id, blocked = entry.blocked, "Policy entry upserted");
        self.publish(identity)
    }

    /// Remove an app's entry entirely
    pub fn remove_entry(
        &self,
        identity: &MonitoredIdentity,
        app_id: &AppId,
    ) -> PolicyResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM policy_entries
                 WHERE parent_id = ? AND child_id = ? AND app_id = ?",
                params![identity.parent_id, identity.child_id, app_id.as_str()],
            )?;
        }

        debug!(app_id = %app_id, "Policy entry removed");
        self.publish(identity)
    }
}

#[async_trait]
impl PolicyStore for SqlitePolicyStore {
    async fn fetch(&self, identity: &MonitoredIdentity) -> PolicyResult<PolicyTable> {
        self.load_table(identity)
    }

    fn subscribe(&self) -> broadcast::Receiver<PolicyTable> {
        self.push_tx.subscribe()
    }

    async fn set_blocked(
        &self,
        identity: &MonitoredIdentity,
        app_id: &AppId,
        blocked: bool,
    ) -> PolicyResult<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                r#"
                INSERT INTO policy_entries (parent_id, child_id, app_id, blocked)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(parent_id, child_id, app_id)
                DO UPDATE SET blocked = excluded.blocked
                "#,
                params![
                    identity.parent_id,
                    identity.child_id,
                    app_id.as_str(),
                    blocked,
                ],
            )?;
        }

        debug!(app_id = %app_id, blocked, "Blocked flag written back");
        self.publish(identity)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Policy store lock poisoned");
                false
            }
        }
    }
}
