//! Mock host adapters for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use warden_util::AppId;

use crate::{
    ForegroundEvent, ForegroundMonitor, HostError, HostResult, OverlayAction, OverlayPresenter,
};

/// Calls recorded by the mock overlay, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCall {
    Show(AppId),
    Hide,
    NavigateHome,
}

/// Mock foreground monitor; tests inject events via `emit`.
pub struct MockForeground {
    event_tx: mpsc::UnboundedSender<ForegroundEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<ForegroundEvent>>>,
}

impl MockForeground {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
        }
    }

    /// Simulate an OS foreground change
    pub fn emit(&self, app_id: impl Into<AppId>) {
        let _ = self.event_tx.send(ForegroundEvent::new(app_id));
    }
}

impl Default for MockForeground {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundMonitor for MockForeground {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ForegroundEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}

/// Mock overlay presenter recording every call.
pub struct MockOverlay {
    calls: Arc<Mutex<Vec<OverlayCall>>>,
    action_tx: mpsc::UnboundedSender<OverlayAction>,
    action_rx: Mutex<Option<mpsc::UnboundedReceiver<OverlayAction>>>,

    /// Configure `show` to fail with `PermissionDenied`
    pub deny_permission: Arc<Mutex<bool>>,
}

impl MockOverlay {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            action_tx: tx,
            action_rx: Mutex::new(Some(rx)),
            deny_permission: Arc::new(Mutex::new(false)),
        }
    }

    /// Simulate the user pressing the overlay's affordance
    pub fn acknowledge(&self) {
        let _ = self.action_tx.send(OverlayAction::Acknowledged);
    }

    /// Calls recorded so far
    pub fn recorded_calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `Show` calls recorded
    pub fn show_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, OverlayCall::Show(_)))
            .count()
    }
}

impl Default for MockOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OverlayPresenter for MockOverlay {
    async fn show(&self, app_id: &AppId) -> HostResult<()> {
        if *self.deny_permission.lock().unwrap() {
            return Err(HostError::PermissionDenied(
                "overlay permission not granted".into(),
            ));
        }
        self.calls
            .lock()
            .unwrap()
            .push(OverlayCall::Show(app_id.clone()));
        Ok(())
    }

    async fn hide(&self) -> HostResult<()> {
        self.calls.lock().unwrap().push(OverlayCall::Hide);
        Ok(())
    }

    async fn navigate_home(&self) -> HostResult<()> {
        self.calls.lock().unwrap().push(OverlayCall::NavigateHome);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<OverlayAction> {
        self.action_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
