//! In-memory policy mirror

use std::time::Duration;
use tracing::debug;
use warden_util::AppId;

use crate::PolicyTable;

/// The engine's read-only mirror of the policy store's table.
///
/// `refresh` replaces the entire table atomically from the caller's point of
/// view: the cache is only ever touched from the engine's single event loop,
/// and a refresh swaps the whole table in one assignment, so lookups never
/// observe a mix of old and new entries.
#[derive(Debug, Default)]
pub struct PolicyCache {
    table: PolicyTable,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire cached table
    pub fn refresh(&mut self, table: PolicyTable) {
        debug!(entry_count = table.len(), "Policy cache refreshed");
        self.table = table;
    }

    /// Whether the app is blocked. Unknown apps are not blocked.
    pub fn is_blocked(&self, app_id: &AppId) -> bool {
        self.table.get(app_id).map(|e| e.blocked).unwrap_or(false)
    }

    /// The app's effective time limit. Unknown apps have none.
    pub fn time_limit(&self, app_id: &AppId) -> Option<Duration> {
        self.table.get(app_id).and_then(|e| e.time_limit())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyEntry;

    #[test]
    fn lookups_normalize_keys() {
        let mut cache = PolicyCache::new();
        cache.refresh(PolicyTable::from_entries([
            PolicyEntry::new("foo.bar").blocked(),
        ]));

        assert!(cache.is_blocked(&AppId::new("  Foo.Bar ")));
        assert!(cache.is_blocked(&AppId::new("foo.bar")));
    }

    #[test]
    fn unknown_app_is_not_blocked_and_has_no_limit() {
        let cache = PolicyCache::new();
        let unknown = AppId::new("never.seen");

        assert!(!cache.is_blocked(&unknown));
        assert!(cache.time_limit(&unknown).is_none());
    }

    #[test]
    fn refresh_replaces_wholesale() {
        let mut cache = PolicyCache::new();
        cache.refresh(PolicyTable::from_entries([
            PolicyEntry::new("a.old").blocked(),
            PolicyEntry::new("b.old").with_time_limit(60),
        ]));

        cache.refresh(PolicyTable::from_entries([
            PolicyEntry::new("c.new").blocked(),
        ]));

        // Old entries are gone, not merged
        assert!(!cache.is_blocked(&AppId::new("a.old")));
        assert!(cache.time_limit(&AppId::new("b.old")).is_none());
        assert!(cache.is_blocked(&AppId::new("c.new")));
        assert_eq!(cache.len(), 1);
    }
}
