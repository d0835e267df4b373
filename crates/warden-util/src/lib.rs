//! Shared utilities for wardend
//!
//! This crate provides:
//! - Identifier types (AppId, MonitoredIdentity)
//! - Time utilities (monotonic time, duration helpers)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
