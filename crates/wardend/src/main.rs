//! wardend - the app-usage enforcement service
//!
//! Wires together all the components:
//! - Configuration loading
//! - Policy store + push subscription
//! - Enforcement engine and timer registry
//! - Host adapter (foreground monitor + overlay presenter)
//!
//! The main loop serializes the three asynchronous sources (foreground
//! changes, policy pushes, timer events) plus overlay acknowledgements into
//! a single stream of engine events; side effects are executed
//! fire-and-forget so slow I/O never blocks event intake.

mod host;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use warden_config::load_config;
use warden_core::{EnforcementEngine, EngineEffect, EngineEvent, TimerEvent, TimerRegistry};
use warden_host_api::{
    ForegroundEvent, ForegroundMonitor, HostError, OverlayAction, OverlayPresenter,
};
use warden_policy::{PolicyStore, PolicyTable, SqlitePolicyStore};
use warden_util::{default_config_path, format_duration, MonitoredIdentity, WARDEN_DATA_DIR_ENV};

use host::DevHost;

/// wardend - app-usage enforcement service for paired parent/child devices
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "App-usage enforcement service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/warden/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set WARDEN_DATA_DIR env var)
    #[arg(short, long, env = WARDEN_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: EnforcementEngine,
    store: Arc<dyn PolicyStore>,
    overlay: Arc<dyn OverlayPresenter>,
    identity: Option<MonitoredIdentity>,
    resync_interval: Option<Duration>,

    fg_events: mpsc::UnboundedReceiver<ForegroundEvent>,
    policy_rx: broadcast::Receiver<PolicyTable>,
    timer_events: mpsc::UnboundedReceiver<TimerEvent>,
    overlay_actions: mpsc::UnboundedReceiver<OverlayAction>,
}

impl Service {
    fn new(
        config: warden_config::Config,
        store: Arc<dyn PolicyStore>,
        monitor: &dyn ForegroundMonitor,
        overlay: Arc<dyn OverlayPresenter>,
    ) -> Self {
        let mut timers = TimerRegistry::new();
        let timer_events = timers
            .take_event_receiver()
            .expect("timer event receiver should be available");

        let engine = EnforcementEngine::new(config.enforcement.self_app.clone(), timers);

        let fg_events = monitor.subscribe();
        let policy_rx = store.subscribe();
        let overlay_actions = overlay.subscribe();

        if config.identity.is_none() {
            info!("No monitored identity configured; enforcement idle until enrollment");
        }

        Self {
            engine,
            store,
            overlay,
            identity: config.identity,
            resync_interval: config.enforcement.resync_interval,
            fg_events,
            policy_rx,
            timer_events,
            overlay_actions,
        }
    }

    async fn run(self) -> Result<()> {
        let Service {
            mut engine,
            store,
            overlay,
            identity,
            resync_interval,
            mut fg_events,
            mut policy_rx,
            mut timer_events,
            mut overlay_actions,
        } = self;

        // Cold start: pull the table once before relying on the push
        // subscription. Failure is transient; the subscription or the next
        // resync will deliver the table eventually.
        if let Some(id) = &identity {
            match store.fetch(id).await {
                Ok(table) => {
                    info!(entry_count = table.len(), "Initial policy fetched");
                    let effects = engine.handle(EngineEvent::PolicyRefreshed(table));
                    execute_effects(&store, &overlay, &identity, effects);
                }
                Err(e) => warn!(error = %e, "Initial policy fetch failed"),
            }
        }

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let mut resync = resync_interval.map(tokio::time::interval);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // Foreground changes
                Some(event) = fg_events.recv() => {
                    if identity.is_none() {
                        debug!(app_id = %event.app_id, "No identity; foreground event ignored");
                        continue;
                    }
                    let effects = engine.handle(EngineEvent::ForegroundChanged(event.app_id));
                    execute_effects(&store, &overlay, &identity, effects);
                }

                // Policy pushes (complete table on every change)
                result = policy_rx.recv() => {
                    match result {
                        Ok(table) => {
                            let effects = engine.handle(EngineEvent::PolicyRefreshed(table));
                            execute_effects(&store, &overlay, &identity, effects);
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            // Pushes carry the full table, so only the
                            // latest matters; re-fetch to catch up.
                            warn!(missed, "Policy subscription lagged, re-fetching");
                            if let Some(id) = &identity {
                                match store.fetch(id).await {
                                    Ok(table) => {
                                        let effects = engine.handle(EngineEvent::PolicyRefreshed(table));
                                        execute_effects(&store, &overlay, &identity, effects);
                                    }
                                    Err(e) => warn!(error = %e, "Catch-up policy fetch failed"),
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Policy subscription closed");
                            break;
                        }
                    }
                }

                // Timer ticks and expirations, generation-checked
                Some(timer_event) = timer_events.recv() => {
                    if !engine.admit_timer_event(&timer_event) {
                        continue;
                    }
                    match timer_event {
                        TimerEvent::Tick { app_id, remaining, .. } => {
                            debug!(app_id = %app_id, remaining = %format_duration(remaining), "Countdown tick");
                        }
                        TimerEvent::Expired { app_id, .. } => {
                            let effects = engine.handle(EngineEvent::TimerExpired(app_id));
                            execute_effects(&store, &overlay, &identity, effects);
                        }
                    }
                }

                // User pressed the overlay's affordance
                Some(action) = overlay_actions.recv() => {
                    let OverlayAction::Acknowledged = action;
                    let effects = engine.handle(EngineEvent::Acknowledged);
                    execute_effects(&store, &overlay, &identity, effects);
                }

                // Periodic full re-fetch as a safety net under the push
                // subscription
                _ = async { resync.as_mut().unwrap().tick().await }, if resync.is_some() => {
                    if let Some(id) = &identity {
                        match store.fetch(id).await {
                            Ok(table) => {
                                debug!(entry_count = table.len(), "Periodic policy resync");
                                let effects = engine.handle(EngineEvent::PolicyRefreshed(table));
                                execute_effects(&store, &overlay, &identity, effects);
                            }
                            Err(e) => warn!(error = %e, "Periodic policy resync failed"),
                        }
                    }
                }
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Execute a transition's side effects fire-and-forget. The event loop never
/// waits on overlay rendering or store write-backs; failures are logged and
/// retried naturally by later events.
fn execute_effects(
    store: &Arc<dyn PolicyStore>,
    overlay: &Arc<dyn OverlayPresenter>,
    identity: &Option<MonitoredIdentity>,
    effects: Vec<EngineEffect>,
) {
    for effect in effects {
        match effect {
            EngineEffect::ShowOverlay(app_id) => {
                let overlay = overlay.clone();
                tokio::spawn(async move {
                    match overlay.show(&app_id).await {
                        Ok(()) => {}
                        Err(HostError::PermissionDenied(msg)) => {
                            // Degraded mode: keep tracking state so blocking
                            // resumes the moment permission is granted.
                            warn!(app_id = %app_id, reason = %msg, "Overlay denied, running degraded");
                        }
                        Err(e) => warn!(app_id = %app_id, error = %e, "Failed to show overlay"),
                    }
                });
            }

            EngineEffect::HideOverlay => {
                let overlay = overlay.clone();
                tokio::spawn(async move {
                    if let Err(e) = overlay.hide().await {
                        warn!(error = %e, "Failed to hide overlay");
                    }
                });
            }

            EngineEffect::NavigateHome => {
                let overlay = overlay.clone();
                tokio::spawn(async move {
                    if let Err(e) = overlay.navigate_home().await {
                        warn!(error = %e, "Failed to navigate home");
                    }
                });
            }

            EngineEffect::MarkBlocked(app_id) => {
                let Some(id) = identity.clone() else {
                    warn!(app_id = %app_id, "No identity; write-back dropped");
                    continue;
                };
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = store.set_blocked(&id, &app_id, true).await {
                        // Not retried here; the next expiry or refresh
                        // retries naturally.
                        warn!(app_id = %app_id, error = %e, "Blocked-flag write-back failed");
                    }
                });
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "wardend starting");

    // Load configuration
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let data_dir = args.data_dir.unwrap_or_else(|| config.daemon.data_dir.clone());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    // Open the policy store
    let db_path = data_dir.join("policy.db");
    let store: Arc<dyn PolicyStore> = Arc::new(
        SqlitePolicyStore::open(&db_path)
            .with_context(|| format!("Failed to open policy database {:?}", db_path))?,
    );

    info!(db_path = %db_path.display(), "Policy store opened");

    // Host adapter: foreground events and overlay rendering
    let host = DevHost::new();
    host.start();

    let service = Service::new(config, store, host.as_ref(), host.clone());
    service.run().await
}
