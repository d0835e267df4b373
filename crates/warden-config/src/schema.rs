//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// The monitored parent/child pairing. Absent until the device is
    /// enrolled; the daemon idles without it.
    #[serde(default)]
    pub identity: Option<RawIdentity>,

    /// Enforcement settings
    pub enforcement: RawEnforcementConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Data directory for the policy database
    pub data_dir: Option<PathBuf>,

    /// Log level filter (default: info)
    pub log_level: Option<String>,
}

/// The monitored identity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawIdentity {
    pub parent_id: String,
    pub child_id: String,
}

/// Enforcement settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawEnforcementConfig {
    /// The monitoring app's own identifier; permanently exempt from
    /// blocking.
    pub self_app_id: String,

    /// Interval for periodic full policy re-fetch, as a safety net under
    /// the push subscription. Absent or 0 disables the periodic resync.
    pub resync_interval_seconds: Option<u64>,
}
