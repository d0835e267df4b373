//! Host adapter traits

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use warden_util::AppId;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The host denied the overlay surface (e.g. draw-over-apps permission
    /// revoked). The engine treats this as degraded mode, not a fault.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Monitor unavailable: {0}")]
    MonitorUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A foreground-change notification from the OS.
///
/// The OS fires these on every window-focus change, including redundant
/// repeats for the app already frontmost; consumers must tolerate repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundEvent {
    pub app_id: AppId,
}

impl ForegroundEvent {
    pub fn new(app_id: impl Into<AppId>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

/// User interaction with the blocking overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    /// The single affordance on the overlay was pressed
    Acknowledged,
}

/// Source of foreground-change events
pub trait ForegroundMonitor: Send + Sync {
    /// Subscribe to foreground-change events. Can only be called once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ForegroundEvent>;

    /// Check if the monitor is healthy (e.g. accessibility hook attached)
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Renders and removes the full-screen blocking surface
#[async_trait]
pub trait OverlayPresenter: Send + Sync {
    /// Show the blocking overlay for an app. Showing while already visible
    /// replaces the displayed app identifier; it never stacks surfaces.
    async fn show(&self, app_id: &AppId) -> HostResult<()>;

    /// Remove the overlay if present; idempotent.
    async fn hide(&self) -> HostResult<()>;

    /// Navigate the device to its home screen
    async fn navigate_home(&self) -> HostResult<()>;

    /// Subscribe to user actions on the overlay. Can only be called once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<OverlayAction>;
}
