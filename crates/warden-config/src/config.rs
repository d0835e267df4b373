//! Validated configuration ready for use by the daemon

use crate::schema::RawConfig;
use std::path::PathBuf;
use std::time::Duration;
use warden_util::{AppId, MonitoredIdentity};

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub daemon: DaemonConfig,

    /// The monitored pairing; `None` until the device is enrolled
    pub identity: Option<MonitoredIdentity>,

    pub enforcement: EnforcementConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig {
                data_dir: raw
                    .daemon
                    .data_dir
                    .unwrap_or_else(warden_util::data_dir_without_env),
                log_level: raw.daemon.log_level.unwrap_or_else(|| "info".into()),
            },
            identity: raw
                .identity
                .map(|i| MonitoredIdentity::new(i.parent_id, i.child_id)),
            enforcement: EnforcementConfig {
                self_app: AppId::new(&raw.enforcement.self_app_id),
                resync_interval: raw
                    .enforcement
                    .resync_interval_seconds
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs),
            },
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
}

/// Enforcement configuration
#[derive(Debug, Clone)]
pub struct EnforcementConfig {
    /// The monitoring app's own identifier, exempt from every decision
    pub self_app: AppId,

    /// Periodic full re-fetch interval; `None` disables it
    pub resync_interval: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawDaemonConfig, RawEnforcementConfig};

    #[test]
    fn zero_resync_interval_is_disabled() {
        let config = Config::from_raw(RawConfig {
            config_version: 1,
            daemon: RawDaemonConfig::default(),
            identity: None,
            enforcement: RawEnforcementConfig {
                self_app_id: "com.example.warden".into(),
                resync_interval_seconds: Some(0),
            },
        });

        assert!(config.enforcement.resync_interval.is_none());
    }
}
