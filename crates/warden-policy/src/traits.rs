//! Policy store trait definition

use async_trait::async_trait;
use tokio::sync::broadcast;
use warden_util::{AppId, MonitoredIdentity};

use crate::{PolicyResult, PolicyTable};

/// The policy store holding blocked/time-limit entries per monitored
/// identity.
///
/// Implementations publish the complete current table to subscribers on
/// every change; the table is never patched incrementally. Write-backs are
/// best-effort with no read-after-write guarantee required by the engine.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// One-shot pull of the current table, used for cold start before the
    /// subscription is established.
    async fn fetch(&self, identity: &MonitoredIdentity) -> PolicyResult<PolicyTable>;

    /// Subscribe to table pushes. Each message is the complete current
    /// table for the store's monitored identity.
    fn subscribe(&self) -> broadcast::Receiver<PolicyTable>;

    /// Mark an app blocked (or unblocked). Used by the engine to persist an
    /// expired time limit as a permanent block.
    async fn set_blocked(
        &self,
        identity: &MonitoredIdentity,
        app_id: &AppId,
        blocked: bool,
    ) -> PolicyResult<()>;

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}
