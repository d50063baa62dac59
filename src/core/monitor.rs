//! The stress monitor engine.
//!
//! [`StressMonitor`] is the single owner of all mutable state: activity
//! windows, energy, the intervention scheduler and the toast cooldown. It
//! has no threads and no interior mutability. Each operation runs to
//! completion and returns the messages it wants published; the caller
//! (normally [`crate::hub::MonitorService`]) does the fan-out.
//!
//! Time only moves forward inside the engine. Every `now` is clamped to the
//! latest instant already observed, so a backward step of the host clock
//! freezes engine time instead of corrupting windows or deadlines.

use crate::collector::types::InputEvent;
use crate::config::Config;
use crate::core::aggregator::ActivityAggregator;
use crate::core::model::{self, MAX_ENERGY};
use crate::core::scheduler::{InterventionScheduler, Transition, DEFAULT_BREAK_SECS};
use crate::core::snapshot::{BlinkConfig, OverlayState, StressSnapshot, Toast};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

/// Scroll streak length that triggers the blink toast.
pub const SCROLL_TOAST_STREAK_MINS: i64 = 15;

/// Minimum gap between two scroll toasts.
pub const SCROLL_TOAST_COOLDOWN_MINS: i64 = 15;

/// How long a toast stays visible.
pub const TOAST_VISIBLE_SECS: i64 = 10;

pub const SCROLL_TOAST_MESSAGE: &str = "Blink check! Take a moment to blink and relax your eyes.";

/// Something the engine wants delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Snapshot(StressSnapshot),
    Overlay(OverlayState),
    Toast(Toast),
}

/// Tunables the engine needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    /// Cadence of [`StressMonitor::sample`]; energy drain is quantised to it
    pub snapshot_interval: std::time::Duration,
    pub break_duration: Duration,
    /// Initial blink config, clamped on use
    pub blink: BlinkConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            snapshot_interval: std::time::Duration::from_secs(10),
            break_duration: Duration::seconds(DEFAULT_BREAK_SECS),
            blink: BlinkConfig::default(),
        }
    }
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        let break_secs = i64::try_from(config.break_duration.as_secs()).unwrap_or(DEFAULT_BREAK_SECS);
        Self {
            snapshot_interval: config.snapshot_interval,
            break_duration: Duration::seconds(break_secs),
            blink: config.blink,
        }
    }
}

/// Activity aggregation, stress/energy model and intervention scheduling.
#[derive(Debug)]
pub struct StressMonitor {
    session_id: Uuid,
    settings: MonitorSettings,
    aggregator: ActivityAggregator,
    scheduler: InterventionScheduler,
    energy: f64,
    last_toast_at: Option<DateTime<Utc>>,
    last_overlay: OverlayState,
    latest: DateTime<Utc>,
    transparency: SharedTransparencyLog,
}

impl StressMonitor {
    pub fn new(now: DateTime<Utc>, settings: MonitorSettings) -> Self {
        Self::with_rng(now, settings, StdRng::from_entropy())
    }

    /// Build with a fixed random source, for reproducible jitter.
    pub fn with_rng(now: DateTime<Utc>, settings: MonitorSettings, rng: StdRng) -> Self {
        let scheduler =
            InterventionScheduler::with_rng(now, settings.break_duration, settings.blink, rng);
        let last_overlay = scheduler.overlay_state();
        Self {
            session_id: Uuid::new_v4(),
            settings,
            aggregator: ActivityAggregator::new(),
            scheduler,
            energy: MAX_ENERGY,
            last_toast_at: None,
            last_overlay,
            latest: now,
            transparency: create_shared_log(),
        }
    }

    /// Count ingested events and interventions into a shared log.
    pub fn with_transparency(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency = log;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn scheduler(&self) -> &InterventionScheduler {
        &self.scheduler
    }

    pub fn transparency(&self) -> &SharedTransparencyLog {
        &self.transparency
    }

    pub fn overlay_state(&self) -> OverlayState {
        self.scheduler.overlay_state()
    }

    /// Clamp `now` so engine time never runs backward.
    fn observe(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        if now < self.latest {
            tracing::debug!(
                behind_ms = (self.latest - now).num_milliseconds(),
                "clock stepped backward; holding engine time"
            );
        } else {
            self.latest = now;
        }
        self.latest
    }

    // ── Input ────────────────────────────────────────────────────────

    pub fn ingest(&mut self, event: &InputEvent) {
        let at = self.observe(event.timestamp);
        let event = InputEvent { timestamp: at, ..*event };
        self.aggregator.record(&event);
        self.transparency.record_input(&event.kind);
    }

    pub fn record_key(&mut self, now: DateTime<Utc>) {
        self.ingest(&InputEvent::key_at(now));
    }

    pub fn record_mouse_move(&mut self, x: f64, y: f64, now: DateTime<Utc>) {
        self.ingest(&InputEvent::mouse_move_at(x, y, now));
    }

    pub fn record_scroll(&mut self, now: DateTime<Utc>) {
        self.ingest(&InputEvent::scroll_at(now));
    }

    // ── Ticks ────────────────────────────────────────────────────────

    /// Fast tick: advance break/blink state. The only path that moves
    /// interventions forward on its own.
    pub fn check_transitions(&mut self, now: DateTime<Utc>) -> Vec<Outbound> {
        let now = self.observe(now);
        let transitions = self.scheduler.check(now);
        self.apply(&transitions);
        self.overlay_if_changed().into_iter().collect()
    }

    /// Slow tick: sample activity, drain energy, publish a snapshot and
    /// possibly a scroll toast.
    pub fn sample(&mut self, now: DateTime<Utc>) -> Vec<Outbound> {
        let now = self.observe(now);
        let kpm = self.aggregator.keys_per_minute(now);
        let mouse_rate = self.aggregator.mouse_distance_per_minute(now);
        let stress = model::stress_level(kpm as f64, mouse_rate);

        self.scheduler.observe_stress(stress);
        self.energy = model::drain_energy(
            self.energy,
            stress,
            self.settings.snapshot_interval,
            self.scheduler.is_break_active(),
        );

        let snapshot = self.build_snapshot(now, kpm, mouse_rate, stress);
        let streak = snapshot.scrolling_streak_ms;
        self.transparency.record_snapshot();

        let mut out = vec![Outbound::Snapshot(snapshot)];
        if let Some(toast) = self.scroll_toast(now, streak) {
            out.push(Outbound::Toast(toast));
        }
        out
    }

    /// On-demand read of the current derived state. Does not drain energy
    /// or update the stress used for break jitter.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> StressSnapshot {
        let now = self.observe(now);
        let kpm = self.aggregator.keys_per_minute(now);
        let mouse_rate = self.aggregator.mouse_distance_per_minute(now);
        let stress = model::stress_level(kpm as f64, mouse_rate);
        self.build_snapshot(now, kpm, mouse_rate, stress)
    }

    // ── User commands ────────────────────────────────────────────────

    pub fn request_break(&mut self, now: DateTime<Utc>) -> Vec<Outbound> {
        let now = self.observe(now);
        let transitions = self.scheduler.request_break(now);
        self.after_command(now, &transitions)
    }

    pub fn skip_blink(&mut self, now: DateTime<Utc>) -> Vec<Outbound> {
        let now = self.observe(now);
        let transitions: Vec<_> = self.scheduler.skip_blink(now).into_iter().collect();
        self.after_command(now, &transitions)
    }

    pub fn snooze_blink(&mut self, now: DateTime<Utc>) -> Vec<Outbound> {
        let now = self.observe(now);
        let transitions: Vec<_> = self.scheduler.snooze_blink(now).into_iter().collect();
        self.after_command(now, &transitions)
    }

    /// Replace the blink config. Returns the effective clamped config.
    pub fn set_blink_config(
        &mut self,
        config: BlinkConfig,
        now: DateTime<Utc>,
    ) -> (BlinkConfig, Vec<Outbound>) {
        let now = self.observe(now);
        let (effective, transition) = self.scheduler.set_blink_config(config, now);
        tracing::info!(
            enabled = effective.enabled,
            min_minutes = effective.min_minutes,
            max_minutes = effective.max_minutes,
            next_blink_at = %self.scheduler.next_blink_at(),
            "blink config replaced"
        );
        let transitions: Vec<_> = transition.into_iter().collect();
        let out = self.after_command(now, &transitions);
        (effective, out)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn after_command(&mut self, now: DateTime<Utc>, transitions: &[Transition]) -> Vec<Outbound> {
        self.apply(transitions);
        let mut out: Vec<_> = self.overlay_if_changed().into_iter().collect();
        out.push(Outbound::Snapshot(self.snapshot(now)));
        out
    }

    fn apply(&mut self, transitions: &[Transition]) {
        for transition in transitions {
            match transition {
                Transition::BreakStarted { manual } => {
                    tracing::info!(
                        manual,
                        ends_at = ?self.scheduler.break_ends_at(),
                        "break started"
                    );
                }
                Transition::BreakFinished => {
                    self.energy = MAX_ENERGY;
                    tracing::info!(
                        next_break_at = %self.scheduler.next_break_at(),
                        next_blink_at = %self.scheduler.next_blink_at(),
                        "break finished; energy restored"
                    );
                }
                Transition::BlinkStarted => {
                    tracing::info!(ends_at = ?self.scheduler.blink_ends_at(), "blink reminder");
                }
                Transition::BlinkFinished | Transition::BlinkSkipped | Transition::BlinkSnoozed => {
                    tracing::debug!(
                        ?transition,
                        next_blink_at = %self.scheduler.next_blink_at(),
                        "blink cleared"
                    );
                }
                Transition::BlinkCanceled => {
                    tracing::debug!("blink canceled");
                }
            }
            self.transparency.record_transition(transition);
        }
    }

    fn overlay_if_changed(&mut self) -> Option<Outbound> {
        let overlay = self.scheduler.overlay_state();
        if overlay == self.last_overlay {
            return None;
        }
        self.last_overlay = overlay;
        Some(Outbound::Overlay(overlay))
    }

    fn scroll_toast(&mut self, now: DateTime<Utc>, streak_ms: i64) -> Option<Toast> {
        if streak_ms < Duration::minutes(SCROLL_TOAST_STREAK_MINS).num_milliseconds() {
            return None;
        }
        let cooled_down = match self.last_toast_at {
            Some(last) => now - last > Duration::minutes(SCROLL_TOAST_COOLDOWN_MINS),
            None => true,
        };
        if !cooled_down {
            return None;
        }
        self.last_toast_at = Some(now);
        self.transparency.record_toast();
        tracing::info!(streak_ms, "long scroll streak; sending blink toast");
        Some(Toast {
            message: SCROLL_TOAST_MESSAGE.to_string(),
            expires_at: now + Duration::seconds(TOAST_VISIBLE_SECS),
        })
    }

    fn build_snapshot(
        &self,
        now: DateTime<Utc>,
        kpm: usize,
        mouse_distance_per_min: f64,
        stress_level: f64,
    ) -> StressSnapshot {
        let scheduler = &self.scheduler;
        StressSnapshot {
            session_id: self.session_id,
            taken_at: now,
            kpm: u32::try_from(kpm).unwrap_or(u32::MAX),
            mouse_distance_per_min,
            total_mouse_distance: self.aggregator.cumulative_mouse_distance(),
            energy: self.energy,
            stress_level,
            is_break_active: scheduler.is_break_active(),
            break_ends_at: scheduler.break_ends_at(),
            is_blink_active: scheduler.is_blink_active(),
            blink_ends_at: scheduler.blink_ends_at(),
            next_break_at: scheduler.next_break_at(),
            next_blink_at: scheduler.next_blink_at(),
            last_break_at: scheduler.last_break_at(),
            scrolling_streak_ms: self
                .aggregator
                .scroll_streak_duration(now)
                .num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::OverlayMode;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn monitor() -> StressMonitor {
        StressMonitor::with_rng(t0(), MonitorSettings::default(), StdRng::seed_from_u64(11))
    }

    fn snapshots(out: &[Outbound]) -> Vec<&StressSnapshot> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Snapshot(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_idle_snapshot_is_zero_activity() {
        let mut m = monitor();
        let snap = m.snapshot(t0());
        assert_eq!(snap.kpm, 0);
        assert_eq!(snap.mouse_distance_per_min, 0.0);
        assert_eq!(snap.stress_level, 0.0);
        assert_eq!(snap.energy, 100.0);
        assert_eq!(snap.scrolling_streak_ms, 0);
        assert_eq!(snap.session_id, m.session_id());
    }

    #[test]
    fn test_sample_drains_but_snapshot_does_not() {
        let mut m = monitor();
        m.snapshot(t0() + Duration::seconds(5));
        assert_eq!(m.energy(), 100.0);

        let out = m.sample(t0() + Duration::seconds(10));
        let snap = snapshots(&out)[0];
        assert!((snap.energy - (100.0 - 0.4 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_backward_clock_is_held() {
        let mut m = monitor();
        m.record_key(t0() + Duration::seconds(30));
        let snap = m.snapshot(t0());
        assert_eq!(snap.taken_at, t0() + Duration::seconds(30));
        assert_eq!(snap.kpm, 1);
    }

    #[test]
    fn test_overlay_published_once_per_mode_change() {
        let mut m = monitor();
        let out = m.request_break(t0());
        let overlays: Vec<_> = out
            .iter()
            .filter(|o| matches!(o, Outbound::Overlay(_)))
            .collect();
        assert_eq!(overlays.len(), 1);
        assert_eq!(m.overlay_state().mode, OverlayMode::Break);

        // Idempotent request: no overlay, still a fresh snapshot
        let again = m.request_break(t0() + Duration::seconds(1));
        assert!(again.iter().all(|o| matches!(o, Outbound::Snapshot(_))));
        assert_eq!(again.len(), 1);

        // Nothing changes mid-break
        assert!(m.check_transitions(t0() + Duration::seconds(30)).is_empty());
    }

    #[test]
    fn test_commands_return_effective_config() {
        let mut m = monitor();
        let (effective, _) = m.set_blink_config(
            BlinkConfig {
                enabled: true,
                min_minutes: 90.0,
                max_minutes: 1.0,
                duration_seconds: 100.0,
                snooze_minutes: 0.0,
            },
            t0(),
        );
        assert_eq!(effective.min_minutes, 60.0);
        assert_eq!(effective.max_minutes, 60.0);
        assert_eq!(effective.duration_seconds, 20.0);
        assert_eq!(effective.snooze_minutes, 1.0);
        assert_eq!(m.scheduler().blink_config(), effective);
    }

    #[test]
    fn test_transparency_counts_inputs() {
        let mut m = monitor();
        m.record_key(t0());
        m.record_mouse_move(1.0, 1.0, t0());
        m.record_scroll(t0());
        m.sample(t0());
        let stats = m.transparency().stats();
        assert_eq!(stats.key_events, 1);
        assert_eq!(stats.mouse_events, 1);
        assert_eq!(stats.scroll_events, 1);
        assert_eq!(stats.snapshots_published, 1);
    }
}
