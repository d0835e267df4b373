//! Enforcement engine state machine

use tracing::{debug, info};
use warden_policy::{PolicyCache, PolicyTable};
use warden_util::AppId;

use crate::{EngineEffect, EngineEvent, TimerEvent, TimerRegistry};

/// The session's enforcement state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No foreground app tracked
    Idle,

    /// A non-blocked, non-expired app is foreground
    Watching(AppId),

    /// The overlay is showing (or requested) for this app
    Blocked(AppId),
}

/// The enforcement engine.
///
/// Consumes the serialized event stream and folds it into the session
/// state, driving the timer registry and emitting overlay/write-back
/// effects. `handle` is the only mutation point: no concurrent event is
/// processed until the previous transition's effects have been issued, so
/// the session state and the timer set have a single writer.
pub struct EnforcementEngine {
    cache: PolicyCache,
    timers: TimerRegistry,

    /// The monitoring app's own identifier, permanently exempt from every
    /// block and timer decision.
    self_app: AppId,

    state: SessionState,
    foreground: Option<AppId>,

    /// The app the overlay is currently showing for, if visible
    overlay: Option<AppId>,
}

impl EnforcementEngine {
    pub fn new(self_app: AppId, timers: TimerRegistry) -> Self {
        info!(self_app = %self_app, "Enforcement engine initialized");
        Self {
            cache: PolicyCache::new(),
            timers,
            self_app,
            state: SessionState::Idle,
            foreground: None,
            overlay: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn foreground(&self) -> Option<&AppId> {
        self.foreground.as_ref()
    }

    /// The app the overlay is showing for, if visible
    pub fn overlay_app(&self) -> Option<&AppId> {
        self.overlay.as_ref()
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn cache(&self) -> &PolicyCache {
        &self.cache
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Liveness-check a timer event before feeding it to `handle`. Stale
    /// events (cancelled or superseded generations) return false and must
    /// be dropped by the caller.
    pub fn admit_timer_event(&mut self, event: &TimerEvent) -> bool {
        self.timers.admit(event)
    }

    /// Process one event and return the side effects to execute.
    pub fn handle(&mut self, event: EngineEvent) -> Vec<EngineEffect> {
        match event {
            EngineEvent::ForegroundChanged(app_id) => self.on_foreground_changed(app_id),
            EngineEvent::TimerExpired(app_id) => self.on_timer_expired(app_id),
            EngineEvent::PolicyRefreshed(table) => self.on_policy_refreshed(table),
            EngineEvent::Acknowledged => self.on_acknowledged(),
        }
    }

    fn on_foreground_changed(&mut self, app_id: AppId) -> Vec<EngineEffect> {
        if app_id == self.self_app {
            debug!(app_id = %app_id, "Ignoring own app");
            return Vec::new();
        }

        let mut effects = Vec::new();

        // Leaving the foreground cancels the previous app's countdown; no
        // background countdown ever runs.
        if let Some(prev) = self.foreground.take() {
            if prev != app_id {
                self.timers.cancel(&prev);
            }
        }
        self.foreground = Some(app_id.clone());

        if self.cache.is_blocked(&app_id) {
            self.transition_to_blocked(app_id, &mut effects);
        } else if self.overlay.as_ref() == Some(&app_id) {
            // The overlay is up for this app but the cache does not say
            // blocked yet: its timer just expired and the blocked-flag
            // write-back has not landed. A redundant foreground repeat must
            // not tear the overlay down or grant a fresh countdown.
            debug!(app_id = %app_id, "Repeat for overlaid app, block stands");
            self.state = SessionState::Blocked(app_id);
        } else {
            if self.overlay.is_some() {
                effects.push(EngineEffect::HideOverlay);
                self.overlay = None;
            }

            self.state = SessionState::Watching(app_id.clone());

            if let Some(limit) = self.cache.time_limit(&app_id) {
                self.timers.start(app_id, limit);
            }
        }

        effects
    }

    fn on_timer_expired(&mut self, app_id: AppId) -> Vec<EngineEffect> {
        // An expiry for an app that has since left the foreground is a
        // narrow race (the registry cancels on switch) but checked anyway.
        if self.foreground.as_ref() != Some(&app_id) {
            debug!(app_id = %app_id, "Expiry for non-foreground app discarded");
            return Vec::new();
        }

        info!(app_id = %app_id, "Time limit expired, converting to block");

        let mut effects = vec![EngineEffect::MarkBlocked(app_id.clone())];
        self.transition_to_blocked(app_id, &mut effects);
        effects
    }

    fn on_policy_refreshed(&mut self, table: PolicyTable) -> Vec<EngineEffect> {
        self.cache.refresh(table);

        let Some(app_id) = self.foreground.clone() else {
            return Vec::new();
        };

        let mut effects = Vec::new();

        if self.cache.is_blocked(&app_id) {
            // Blocked wins: any running countdown for the app stops.
            self.timers.cancel(&app_id);
            self.transition_to_blocked(app_id, &mut effects);
        } else {
            if self.overlay.is_some() {
                effects.push(EngineEffect::HideOverlay);
                self.overlay = None;
            }

            self.state = SessionState::Watching(app_id.clone());

            // A limit added remotely while the app is already foreground
            // starts a countdown without waiting for a foreground change.
            if let Some(limit) = self.cache.time_limit(&app_id) {
                if !self.timers.is_running(&app_id) {
                    self.timers.start(app_id, limit);
                }
            }
        }

        effects
    }

    fn on_acknowledged(&mut self) -> Vec<EngineEffect> {
        info!("Overlay acknowledged, returning to home");

        self.state = SessionState::Idle;
        self.foreground = None;
        self.overlay = None;

        // The block flag itself is untouched; the app stays blocked until
        // policy says otherwise.
        vec![EngineEffect::HideOverlay, EngineEffect::NavigateHome]
    }

    /// Enter `Blocked` for an app, requesting the overlay unless it is
    /// already showing for this exact app.
    fn transition_to_blocked(&mut self, app_id: AppId, effects: &mut Vec<EngineEffect>) {
        if self.overlay.as_ref() != Some(&app_id) {
            effects.push(EngineEffect::ShowOverlay(app_id.clone()));
            self.overlay = Some(app_id.clone());
        }
        self.state = SessionState::Blocked(app_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warden_policy::PolicyEntry;

    const SELF_APP: &str = "com.example.warden";

    fn engine() -> EnforcementEngine {
        EnforcementEngine::new(AppId::new(SELF_APP), TimerRegistry::new())
    }

    fn table(entries: impl IntoIterator<Item = PolicyEntry>) -> PolicyTable {
        PolicyTable::from_entries(entries)
    }

    #[tokio::test]
    async fn blocked_app_shows_overlay() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").blocked(),
        ])));

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert_eq!(
            effects,
            vec![EngineEffect::ShowOverlay(AppId::new("com.example.game"))]
        );
        assert_eq!(
            engine.state(),
            &SessionState::Blocked(AppId::new("com.example.game"))
        );
    }

    #[tokio::test]
    async fn repeated_foreground_events_show_overlay_once() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").blocked(),
        ])));

        let first = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        let second = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert_eq!(first.len(), 1);
        assert!(second.is_empty(), "duplicate overlay request: {second:?}");
    }

    #[tokio::test]
    async fn own_app_is_exempt() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            // Even a policy entry for the monitoring app itself is ignored
            PolicyEntry::new(SELF_APP).blocked(),
        ])));

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(SELF_APP)));

        assert!(effects.is_empty());
        assert_eq!(engine.state(), &SessionState::Idle);
        assert!(engine.foreground().is_none());
    }

    #[tokio::test]
    async fn time_limited_app_starts_countdown() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(300),
        ])));

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert!(effects.is_empty());
        assert_eq!(
            engine.state(),
            &SessionState::Watching(AppId::new("com.example.game"))
        );
        assert!(engine.timers().is_running(&AppId::new("com.example.game")));
    }

    #[tokio::test]
    async fn blocked_wins_over_time_limit() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game")
                .blocked()
                .with_time_limit(5),
        ])));

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert_eq!(
            effects,
            vec![EngineEffect::ShowOverlay(AppId::new("com.example.game"))]
        );
        // No countdown is ever started for a blocked app
        assert_eq!(engine.timers().running_count(), 0);
    }

    #[tokio::test]
    async fn switching_apps_cancels_countdown() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("a.game").with_time_limit(10),
        ])));

        engine.handle(EngineEvent::ForegroundChanged(AppId::new("a.game")));
        assert!(engine.timers().is_running(&AppId::new("a.game")));

        engine.handle(EngineEvent::ForegroundChanged(AppId::new("b.other")));
        assert!(!engine.timers().is_running(&AppId::new("a.game")));
        assert_eq!(engine.timers().running_count(), 0);
    }

    #[tokio::test]
    async fn expiry_marks_blocked_and_shows_overlay() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(5),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        let effects = engine.handle(EngineEvent::TimerExpired(AppId::new("com.example.game")));

        assert_eq!(
            effects,
            vec![
                EngineEffect::MarkBlocked(AppId::new("com.example.game")),
                EngineEffect::ShowOverlay(AppId::new("com.example.game")),
            ]
        );
        assert_eq!(
            engine.state(),
            &SessionState::Blocked(AppId::new("com.example.game"))
        );
    }

    #[tokio::test]
    async fn foreground_repeat_after_expiry_keeps_block() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(5),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        engine.handle(EngineEvent::TimerExpired(AppId::new("com.example.game")));

        // The blocked-flag write-back has not landed in the cache yet; a
        // redundant OS repeat for the same app must not hide the overlay or
        // restart the countdown.
        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert!(effects.is_empty(), "unexpected effects: {effects:?}");
        assert_eq!(
            engine.state(),
            &SessionState::Blocked(AppId::new("com.example.game"))
        );
        assert!(engine.is_overlay_visible());
        assert_eq!(engine.timers().running_count(), 0);
    }

    #[tokio::test]
    async fn stale_expiry_for_background_app_is_discarded() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("a.game").with_time_limit(5),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new("a.game")));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new("b.other")));

        let effects = engine.handle(EngineEvent::TimerExpired(AppId::new("a.game")));

        assert!(effects.is_empty());
        assert_eq!(engine.state(), &SessionState::Watching(AppId::new("b.other")));
    }

    #[tokio::test]
    async fn policy_push_blocks_current_foreground() {
        let mut engine = engine();
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        assert_eq!(
            engine.state(),
            &SessionState::Watching(AppId::new("com.example.game"))
        );

        // Parent blocks the app remotely; no new foreground event needed
        let effects = engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").blocked(),
        ])));

        assert_eq!(
            effects,
            vec![EngineEffect::ShowOverlay(AppId::new("com.example.game"))]
        );
        assert_eq!(
            engine.state(),
            &SessionState::Blocked(AppId::new("com.example.game"))
        );
    }

    #[tokio::test]
    async fn policy_push_adds_limit_to_foreground_app() {
        let mut engine = engine();
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        assert_eq!(engine.timers().running_count(), 0);

        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(120),
        ])));

        assert!(engine.timers().is_running(&AppId::new("com.example.game")));
    }

    #[tokio::test]
    async fn policy_push_does_not_reset_running_countdown() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(300),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        assert_eq!(
            engine.timers().remaining(&AppId::new("com.example.game")),
            Some(Duration::from_secs(300))
        );

        // A refresh with a different limit must not restart the countdown
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").with_time_limit(600),
        ])));

        assert_eq!(engine.timers().running_count(), 1);
        assert_eq!(
            engine.timers().remaining(&AppId::new("com.example.game")),
            Some(Duration::from_secs(300))
        );
    }

    #[tokio::test]
    async fn policy_push_unblocking_hides_overlay() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").blocked(),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        assert!(engine.is_overlay_visible());

        let effects = engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game"),
        ])));

        assert_eq!(effects, vec![EngineEffect::HideOverlay]);
        assert_eq!(
            engine.state(),
            &SessionState::Watching(AppId::new("com.example.game"))
        );
    }

    #[tokio::test]
    async fn switching_from_blocked_to_clean_app_hides_overlay() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("a.blocked").blocked(),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new("a.blocked")));
        assert!(engine.is_overlay_visible());

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new("b.clean")));

        assert_eq!(effects, vec![EngineEffect::HideOverlay]);
        assert!(!engine.is_overlay_visible());
        assert_eq!(engine.state(), &SessionState::Watching(AppId::new("b.clean")));
    }

    #[tokio::test]
    async fn switching_between_two_blocked_apps_replaces_overlay() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("a.blocked").blocked(),
            PolicyEntry::new("b.blocked").blocked(),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new("a.blocked")));

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new("b.blocked")));

        assert_eq!(
            effects,
            vec![EngineEffect::ShowOverlay(AppId::new("b.blocked"))]
        );
        assert_eq!(engine.overlay_app(), Some(&AppId::new("b.blocked")));
    }

    #[tokio::test]
    async fn acknowledge_hides_and_goes_home_but_keeps_block() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("com.example.game").blocked(),
        ])));
        engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        let effects = engine.handle(EngineEvent::Acknowledged);

        assert_eq!(
            effects,
            vec![EngineEffect::HideOverlay, EngineEffect::NavigateHome]
        );
        assert_eq!(engine.state(), &SessionState::Idle);
        // The block itself is untouched: re-foregrounding re-blocks
        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));
        assert_eq!(
            effects,
            vec![EngineEffect::ShowOverlay(AppId::new("com.example.game"))]
        );
    }

    #[tokio::test]
    async fn events_before_any_policy_are_harmless() {
        let mut engine = engine();

        let effects = engine.handle(EngineEvent::ForegroundChanged(AppId::new(
            "com.example.game",
        )));

        assert!(effects.is_empty());
        assert_eq!(
            engine.state(),
            &SessionState::Watching(AppId::new("com.example.game"))
        );
    }

    #[tokio::test]
    async fn normalization_applies_across_sources() {
        let mut engine = engine();
        engine.handle(EngineEvent::PolicyRefreshed(table([
            PolicyEntry::new("foo.bar").blocked(),
        ])));

        // Foreground event with messy casing/whitespace still matches
        let effects =
            engine.handle(EngineEvent::ForegroundChanged(AppId::new("  Foo.Bar ")));

        assert_eq!(effects, vec![EngineEffect::ShowOverlay(AppId::new("foo.bar"))]);
    }
}
