//! Policy entry and table types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use warden_util::AppId;

/// Blocked/time-limit configuration for one monitored application.
///
/// An entry may be both blocked and time-limited; blocked always wins and no
/// countdown is tracked for a blocked app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub app_id: AppId,

    /// Whether the app is blocked outright
    #[serde(default)]
    pub blocked: bool,

    /// Remaining time limit in whole seconds. `None` or `Some(0)` means no
    /// time limit is tracked for this app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u64>,
}

impl PolicyEntry {
    pub fn new(app_id: impl Into<AppId>) -> Self {
        Self {
            app_id: app_id.into(),
            blocked: false,
            time_limit_seconds: None,
        }
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    /// The effective time limit. Zero-second limits collapse to `None`.
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_seconds {
            Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }
}

/// The complete policy table for one monitored identity.
///
/// Always replaced wholesale: the store publishes the full current table on
/// every change, never a partial patch, so readers can never observe a mix
/// of old and new entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    entries: HashMap<AppId, PolicyEntry>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = PolicyEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.app_id.clone(), e))
                .collect(),
        }
    }

    /// Insert or replace the entry for its app id
    pub fn insert(&mut self, entry: PolicyEntry) {
        self.entries.insert(entry.app_id.clone(), entry);
    }

    pub fn get(&self, app_id: &AppId) -> Option<&PolicyEntry> {
        self.entries.get(app_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
