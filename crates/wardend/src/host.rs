//! Development host adapter
//!
//! Stands in for the platform accessibility/window integration, which lives
//! outside this repository. Foreground changes and overlay acknowledgements
//! are read line-by-line from stdin (`ack` acknowledges the overlay, any
//! other line is treated as the new frontmost app identifier); the overlay
//! is rendered as log output.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use warden_host_api::{
    ForegroundEvent, ForegroundMonitor, HostResult, OverlayAction, OverlayPresenter,
};
use warden_util::AppId;

pub struct DevHost {
    fg_tx: mpsc::UnboundedSender<ForegroundEvent>,
    fg_rx: Mutex<Option<mpsc::UnboundedReceiver<ForegroundEvent>>>,
    action_tx: mpsc::UnboundedSender<OverlayAction>,
    action_rx: Mutex<Option<mpsc::UnboundedReceiver<OverlayAction>>>,
}

impl DevHost {
    pub fn new() -> Arc<Self> {
        let (fg_tx, fg_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            fg_tx,
            fg_rx: Mutex::new(Some(fg_rx)),
            action_tx,
            action_rx: Mutex::new(Some(action_rx)),
        })
    }

    /// Start the stdin reader task
    pub fn start(self: &Arc<Self>) {
        let host = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("ack") {
                    let _ = host.action_tx.send(OverlayAction::Acknowledged);
                } else {
                    let _ = host.fg_tx.send(ForegroundEvent::new(line));
                }
            }
            debug!("Dev host stdin closed");
        });
    }
}

impl ForegroundMonitor for DevHost {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ForegroundEvent> {
        self.fg_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}

#[async_trait]
impl OverlayPresenter for DevHost {
    async fn show(&self, app_id: &AppId) -> HostResult<()> {
        info!(app_id = %app_id, "OVERLAY SHOWN (app is blocked)");
        Ok(())
    }

    async fn hide(&self) -> HostResult<()> {
        info!("OVERLAY HIDDEN");
        Ok(())
    }

    async fn navigate_home(&self) -> HostResult<()> {
        info!("NAVIGATING HOME");
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
