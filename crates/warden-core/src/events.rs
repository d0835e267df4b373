//! Engine input events and output effects

use std::time::Duration;
use warden_policy::PolicyTable;
use warden_util::AppId;

/// Inputs to the enforcement engine, one tagged variant per source.
///
/// All three asynchronous sources (foreground monitor, policy subscription,
/// timer registry) plus the overlay acknowledgement are serialized into a
/// single stream of these before touching engine state.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The OS reported a new frontmost application
    ForegroundChanged(AppId),

    /// A countdown for an app reached zero without being cancelled
    TimerExpired(AppId),

    /// The policy store pushed a fresh complete table
    PolicyRefreshed(PolicyTable),

    /// The user pressed the overlay's single affordance
    Acknowledged,
}

/// Side effects requested by a state transition.
///
/// The engine never performs I/O itself; the daemon executes these
/// fire-and-forget after each transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEffect {
    /// Render the blocking overlay for an app
    ShowOverlay(AppId),

    /// Remove the blocking overlay
    HideOverlay,

    /// Persist "this app is now blocked" to the policy store
    MarkBlocked(AppId),

    /// Send the device to its home screen
    NavigateHome,
}

/// Events emitted by running countdown timers.
///
/// Each event carries the generation of the timer that produced it; the
/// registry's `admit` check discards events from cancelled generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Advisory once-per-second update of the remaining time
    Tick {
        app_id: AppId,
        remaining: Duration,
        generation: u64,
    },

    /// The countdown reached zero. Exactly one per timer unless cancelled
    /// first.
    Expired { app_id: AppId, generation: u64 },
}

impl TimerEvent {
    pub fn app_id(&self) -> &AppId {
        match self {
            TimerEvent::Tick { app_id, .. } => app_id,
            TimerEvent::Expired { app_id, .. } => app_id,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            TimerEvent::Tick { generation, .. } => *generation,
            TimerEvent::Expired { generation, .. } => *generation,
        }
    }
}
