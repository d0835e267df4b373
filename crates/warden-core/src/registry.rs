//! Per-app countdown timer registry

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use warden_util::{AppId, MonotonicInstant};

use crate::TimerEvent;

/// A running countdown for one app
#[derive(Debug)]
struct RunningTimer {
    generation: u64,
    remaining: Duration,
    started_at: MonotonicInstant,
    task: JoinHandle<()>,
}

/// Owns at most one running countdown per app.
///
/// `start` for an already-running app is a silent no-op; a later `start`
/// never resets a running countdown even with a different duration, because
/// duration changes arrive asynchronously via policy refresh and must not
/// grant countdown resets. Each timer carries a generation number: after
/// `cancel` returns, any tick or expiry still in flight for the cancelled
/// generation fails the `admit` check and is discarded.
pub struct TimerRegistry {
    timers: HashMap<AppId, RunningTimer>,
    next_generation: u64,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<TimerEvent>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            timers: HashMap::new(),
            next_generation: 0,
            event_tx: tx,
            event_rx: Some(rx),
        }
    }

    /// Take the timer event receiver. Can only be taken once; the daemon's
    /// select loop owns it.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TimerEvent>> {
        self.event_rx.take()
    }

    /// Start a countdown for an app. No-op if one is already running.
    pub fn start(&mut self, app_id: AppId, duration: Duration) {
        if duration.is_zero() {
            debug!(app_id = %app_id, "Zero-duration timer ignored");
            return;
        }

        if self.timers.contains_key(&app_id) {
            debug!(app_id = %app_id, "Timer already running, start ignored");
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.event_tx.clone();
        let task_app = app_id.clone();
        let task = tokio::spawn(async move {
            let mut remaining = duration;
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                remaining = remaining.saturating_sub(Duration::from_secs(1));

                if remaining.is_zero() {
                    let _ = tx.send(TimerEvent::Expired {
                        app_id: task_app,
                        generation,
                    });
                    break;
                }

                let _ = tx.send(TimerEvent::Tick {
                    app_id: task_app.clone(),
                    remaining,
                    generation,
                });
            }
        });

        info!(
            app_id = %app_id,
            duration_secs = duration.as_secs(),
            generation,
            "Countdown started"
        );

        self.timers.insert(
            app_id,
            RunningTimer {
                generation,
                remaining: duration,
                started_at: MonotonicInstant::now(),
                task,
            },
        );
    }

    /// Cancel the countdown for an app if present; idempotent.
    pub fn cancel(&mut self, app_id: &AppId) {
        if let Some(timer) = self.timers.remove(app_id) {
            timer.task.abort();
            info!(
                app_id = %app_id,
                remaining_secs = timer.remaining.as_secs(),
                ran_for_secs = timer.started_at.elapsed().as_secs(),
                generation = timer.generation,
                "Countdown cancelled"
            );
        }
    }

    /// Liveness check for a timer event. Events whose generation no longer
    /// matches a running timer (cancelled, or superseded by a fresh start)
    /// are rejected.
    ///
    /// An admitted `Tick` updates the advisory remaining value; an admitted
    /// `Expired` removes the timer, so the same expiry can never be
    /// admitted twice.
    pub fn admit(&mut self, event: &TimerEvent) -> bool {
        let app_id = event.app_id();

        let live = self
            .timers
            .get(app_id)
            .is_some_and(|t| t.generation == event.generation());

        if !live {
            debug!(app_id = %app_id, generation = event.generation(), "Stale timer event discarded");
            return false;
        }

        match event {
            TimerEvent::Tick { remaining, .. } => {
                if let Some(timer) = self.timers.get_mut(app_id) {
                    timer.remaining = *remaining;
                }
            }
            TimerEvent::Expired { .. } => {
                self.timers.remove(app_id);
            }
        }

        true
    }

    pub fn is_running(&self, app_id: &AppId) -> bool {
        self.timers.contains_key(app_id)
    }

    pub fn running_count(&self) -> usize {
        self.timers.len()
    }

    /// Advisory remaining time for a running timer
    pub fn remaining(&self, app_id: &AppId) -> Option<Duration> {
        self.timers.get(app_id).map(|t| t.remaining)
    }

    /// How long a timer has been running
    pub fn running_for(&self, app_id: &AppId) -> Option<Duration> {
        self.timers.get(app_id).map(|t| t.started_at.elapsed())
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_then_exactly_one_expiry() {
        let mut registry = TimerRegistry::new();
        let mut rx = registry.take_event_receiver().unwrap();
        let app = AppId::new("com.example.game");

        registry.start(app.clone(), Duration::from_secs(3));

        let mut ticks = 0;
        loop {
            let event = rx.recv().await.unwrap();
            assert!(registry.admit(&event));
            match event {
                TimerEvent::Tick { remaining, .. } => {
                    ticks += 1;
                    assert_eq!(remaining, Duration::from_secs(3 - ticks));
                }
                TimerEvent::Expired { app_id, .. } => {
                    assert_eq!(app_id, app);
                    break;
                }
            }
        }

        assert_eq!(ticks, 2);
        assert!(!registry.is_running(&app));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_start_is_noop() {
        let mut registry = TimerRegistry::new();
        let _rx = registry.take_event_receiver().unwrap();
        let app = AppId::new("com.example.game");

        registry.start(app.clone(), Duration::from_secs(10));
        registry.start(app.clone(), Duration::from_secs(99));
        registry.start(app.clone(), Duration::from_secs(1));

        assert_eq!(registry.running_count(), 1);
        // The original duration survives later start calls
        assert_eq!(registry.remaining(&app), Some(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_events_are_not_admitted() {
        let mut registry = TimerRegistry::new();
        let mut rx = registry.take_event_receiver().unwrap();
        let app = AppId::new("com.example.game");

        registry.start(app.clone(), Duration::from_secs(10));

        // Let a couple of ticks land in the channel, then cancel
        let first = rx.recv().await.unwrap();
        registry.cancel(&app);
        assert!(!registry.is_running(&app));

        // The tick that arrived before cancellation is now stale
        assert!(!registry.admit(&first));

        // Nothing further is ever delivered for the cancelled timer
        let res = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(res.is_err(), "cancelled timer produced an event");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_cancel_is_fresh() {
        let mut registry = TimerRegistry::new();
        let mut rx = registry.take_event_receiver().unwrap();
        let app = AppId::new("com.example.game");

        registry.start(app.clone(), Duration::from_secs(10));

        // Run 3 seconds, then cancel
        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            registry.admit(&event);
        }
        assert_eq!(registry.remaining(&app), Some(Duration::from_secs(7)));
        registry.cancel(&app);

        // Restart: a full 10 seconds again, not 7
        registry.start(app.clone(), Duration::from_secs(10));
        assert_eq!(registry.remaining(&app), Some(Duration::from_secs(10)));

        // First admitted event of the new generation reports 9s remaining
        loop {
            let event = rx.recv().await.unwrap();
            if registry.admit(&event) {
                match event {
                    TimerEvent::Tick { remaining, .. } => {
                        assert_eq!(remaining, Duration::from_secs(9));
                        break;
                    }
                    TimerEvent::Expired { .. } => panic!("expired too early"),
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn independent_timers_per_app() {
        let mut registry = TimerRegistry::new();
        let _rx = registry.take_event_receiver().unwrap();

        registry.start(AppId::new("a.one"), Duration::from_secs(10));
        registry.start(AppId::new("b.two"), Duration::from_secs(20));

        assert_eq!(registry.running_count(), 2);
        assert!(registry.running_for(&AppId::new("a.one")).is_some());

        registry.cancel(&AppId::new("a.one"));
        assert_eq!(registry.running_count(), 1);
        assert!(registry.is_running(&AppId::new("b.two")));
    }
}
