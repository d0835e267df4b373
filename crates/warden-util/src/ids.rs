//! Strongly-typed identifiers for wardend

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a monitored application (platform package/bundle name).
///
/// The raw string is normalized (trimmed, lowercased) at construction;
/// two identifiers are equal iff their normalized forms are equal. All map
/// lookups and comparisons in the enforcement path go through this type, so
/// `" Com.Example.Game "` and `"com.example.game"` always refer to the same
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The parent/child pairing this device enforces policy for.
///
/// Both identifiers are opaque to the enforcement core; they are resolved
/// externally (account login and device enrollment) and injected at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredIdentity {
    pub parent_id: String,
    pub child_id: String,
}

impl MonitoredIdentity {
    pub fn new(parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
        }
    }
}

impl fmt::Display for MonitoredIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent_id, self.child_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_normalizes_case_and_whitespace() {
        let a = AppId::new("  Com.Example.Game ");
        let b = AppId::new("com.example.game");

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "com.example.game");
    }

    #[test]
    fn app_id_distinct_packages_differ() {
        let a = AppId::new("com.example.game");
        let b = AppId::new("com.example.other");
        assert_ne!(a, b);
    }

    #[test]
    fn app_id_serializes_as_plain_string() {
        let id = AppId::new("Com.Example.Game");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"com.example.game\"");

        let parsed: AppId = serde_json::from_str("\" Com.Example.Game \"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn identity_display() {
        let identity = MonitoredIdentity::new("parent-1", "child-1");
        assert_eq!(identity.to_string(), "parent-1/child-1");
    }
}
