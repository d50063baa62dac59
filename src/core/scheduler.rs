//! Break and blink intervention scheduling.
//!
//! The scheduler is a three-state machine:
//!
//! ```text
//!            now >= next_break_at / request_break
//!   Idle ───────────────────────────────────────────▶ BreakActive
//!    │ ▲ ◀──────────── now >= break_ends_at ──────────────┘   ▲
//!    │ │                                                      │
//!    │ └──── ends / skip / snooze / disabled ───┐             │ request_break
//!    │                                          │             │ (cancels blink)
//!    └──── now >= next_blink_at, enabled ──▶ BlinkActive ─────┘
//! ```
//!
//! Break always dominates blink. Every operation is total: inputs are
//! clamped, nothing fails. Deadlines are only acted on when [`check`] runs,
//! so latency is bounded by the caller's polling cadence.
//!
//! [`check`]: InterventionScheduler::check

use crate::core::snapshot::{BlinkConfig, OverlayMode, OverlayState};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MINUTE_MS: f64 = 60_000.0;

/// Default length of a break.
pub const DEFAULT_BREAK_SECS: i64 = 60;

/// How far a disabled blink reminder is pushed out.
pub const DISABLED_BLINK_HOURS: i64 = 24;

/// Which intervention currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterventionState {
    Idle,
    BreakActive { ends_at: DateTime<Utc> },
    BlinkActive { ends_at: DateTime<Utc> },
}

impl InterventionState {
    pub fn mode(&self) -> OverlayMode {
        match self {
            InterventionState::Idle => OverlayMode::Normal,
            InterventionState::BreakActive { .. } => OverlayMode::Break,
            InterventionState::BlinkActive { .. } => OverlayMode::Blink,
        }
    }
}

/// A state change produced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BreakStarted { manual: bool },
    BreakFinished,
    BlinkStarted,
    /// Ran its full duration
    BlinkFinished,
    BlinkSkipped,
    BlinkSnoozed,
    /// Preempted by a break or by disabling reminders
    BlinkCanceled,
}

/// Draw `floor(min + U[0,1) * (max - min))` milliseconds.
fn random_in_range(rng: &mut impl Rng, min_ms: f64, max_ms: f64) -> Duration {
    let span = (max_ms - min_ms).max(0.0);
    let drawn = (min_ms + rng.gen::<f64>() * span).floor();
    Duration::milliseconds(drawn as i64)
}

/// Jittered gap until the next break.
///
/// Higher stress narrows and shifts the window earlier: the lower edge moves
/// from 45 towards 35 minutes and the upper edge from 75 towards 55. The
/// result is always within `[25, 75)` minutes.
pub fn break_interval(stress: f64, rng: &mut impl Rng) -> Duration {
    let stress = if stress.is_nan() { 0.0 } else { stress.clamp(0.0, 1.0) };
    let base_min = 45.0 * MINUTE_MS;
    let base_max = 75.0 * MINUTE_MS;
    let adjusted_min = (base_min - stress * 10.0 * MINUTE_MS).clamp(25.0 * MINUTE_MS, base_min);
    let adjusted_max = (base_max - stress * 20.0 * MINUTE_MS).clamp(adjusted_min, base_max);
    random_in_range(rng, adjusted_min, adjusted_max)
}

/// Jittered gap until the next blink reminder, drawn from the config range.
pub fn blink_interval(config: &BlinkConfig, rng: &mut impl Rng) -> Duration {
    random_in_range(
        rng,
        config.min_minutes * MINUTE_MS,
        config.max_minutes * MINUTE_MS,
    )
}

fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * MINUTE_MS) as i64)
}

/// Owns the break and blink timers.
#[derive(Debug)]
pub struct InterventionScheduler {
    state: InterventionState,
    blink_config: BlinkConfig,
    break_duration: Duration,
    next_break_at: DateTime<Utc>,
    next_blink_at: DateTime<Utc>,
    last_break_at: Option<DateTime<Utc>>,
    /// Stress seen at the latest sample; seeds the next break interval
    last_stress: f64,
    rng: StdRng,
}

impl InterventionScheduler {
    /// Create a scheduler with the default blink config, seeded from entropy.
    pub fn new(now: DateTime<Utc>, break_duration: Duration) -> Self {
        Self::with_rng(now, break_duration, BlinkConfig::default(), StdRng::from_entropy())
    }

    /// Create a scheduler with an explicit config and random source.
    ///
    /// The initial break is scheduled as if stress were zero.
    pub fn with_rng(
        now: DateTime<Utc>,
        break_duration: Duration,
        blink_config: BlinkConfig,
        mut rng: StdRng,
    ) -> Self {
        let blink_config = blink_config.clamped();
        let next_break_at = now + break_interval(0.0, &mut rng);
        let mut scheduler = Self {
            state: InterventionState::Idle,
            blink_config,
            break_duration: break_duration.max(Duration::seconds(1)),
            next_break_at,
            next_blink_at: now,
            last_break_at: None,
            last_stress: 0.0,
            rng,
        };
        scheduler.schedule_next_blink(now);
        scheduler
    }

    pub fn state(&self) -> InterventionState {
        self.state
    }

    pub fn is_break_active(&self) -> bool {
        matches!(self.state, InterventionState::BreakActive { .. })
    }

    pub fn is_blink_active(&self) -> bool {
        matches!(self.state, InterventionState::BlinkActive { .. })
    }

    pub fn break_ends_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            InterventionState::BreakActive { ends_at } => Some(ends_at),
            _ => None,
        }
    }

    pub fn blink_ends_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            InterventionState::BlinkActive { ends_at } => Some(ends_at),
            _ => None,
        }
    }

    pub fn next_break_at(&self) -> DateTime<Utc> {
        self.next_break_at
    }

    pub fn next_blink_at(&self) -> DateTime<Utc> {
        self.next_blink_at
    }

    pub fn last_break_at(&self) -> Option<DateTime<Utc>> {
        self.last_break_at
    }

    pub fn blink_config(&self) -> BlinkConfig {
        self.blink_config
    }

    pub fn last_stress(&self) -> f64 {
        self.last_stress
    }

    pub fn overlay_state(&self) -> OverlayState {
        OverlayState {
            mode: self.state.mode(),
            break_ends_at: self.break_ends_at(),
            blink_ends_at: self.blink_ends_at(),
            breathing_active: self.is_break_active(),
        }
    }

    /// Remember the stress level used to jitter the next break.
    pub fn observe_stress(&mut self, stress: f64) {
        if stress.is_finite() {
            self.last_stress = stress.clamp(0.0, 1.0);
        }
    }

    /// Evaluate every deadline against `now` and apply due transitions.
    ///
    /// Order matters: a finishing break reschedules the blink before blink
    /// deadlines are looked at, and neither intervention auto-starts while the
    /// other is showing.
    pub fn check(&mut self, now: DateTime<Utc>) -> Vec<Transition> {
        let mut transitions = Vec::new();

        if let InterventionState::BreakActive { ends_at } = self.state {
            if now >= ends_at {
                self.finish_break(now);
                transitions.push(Transition::BreakFinished);
            }
        }

        if self.state == InterventionState::Idle && now >= self.next_break_at {
            self.start_break(now);
            transitions.push(Transition::BreakStarted { manual: false });
        }

        if let InterventionState::BlinkActive { ends_at } = self.state {
            if now >= ends_at {
                self.state = InterventionState::Idle;
                self.schedule_next_blink(now);
                transitions.push(Transition::BlinkFinished);
            }
        }

        if self.state == InterventionState::Idle
            && self.blink_config.enabled
            && now >= self.next_blink_at
        {
            let ends_at = now + Duration::seconds(self.blink_config.duration_seconds as i64);
            self.state = InterventionState::BlinkActive { ends_at };
            transitions.push(Transition::BlinkStarted);
        }

        transitions
    }

    /// Start a break now. Cancels an active blink without touching its
    /// deadline. A no-op while a break is already running.
    pub fn request_break(&mut self, now: DateTime<Utc>) -> Vec<Transition> {
        if self.is_break_active() {
            return Vec::new();
        }
        let mut transitions = Vec::new();
        if self.is_blink_active() {
            transitions.push(Transition::BlinkCanceled);
        }
        self.start_break(now);
        transitions.push(Transition::BreakStarted { manual: true });
        transitions
    }

    /// Dismiss an active blink; the next one is drawn from `now`.
    pub fn skip_blink(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        if !self.is_blink_active() {
            return None;
        }
        self.state = InterventionState::Idle;
        self.schedule_next_blink(now);
        Some(Transition::BlinkSkipped)
    }

    /// Dismiss an active blink and bring it back after exactly the snooze delay.
    pub fn snooze_blink(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        if !self.is_blink_active() {
            return None;
        }
        self.state = InterventionState::Idle;
        self.next_blink_at = now + minutes(self.blink_config.snooze_minutes);
        Some(Transition::BlinkSnoozed)
    }

    /// Replace the blink config and return the effective (clamped) value.
    ///
    /// Disabling cancels an active blink and parks the deadline a day out.
    /// Enabling redraws the deadline from `now` with the new range.
    pub fn set_blink_config(
        &mut self,
        config: BlinkConfig,
        now: DateTime<Utc>,
    ) -> (BlinkConfig, Option<Transition>) {
        self.blink_config = config.clamped();
        let mut transition = None;
        if !self.blink_config.enabled && self.is_blink_active() {
            self.state = InterventionState::Idle;
            transition = Some(Transition::BlinkCanceled);
        }
        self.schedule_next_blink(now);
        (self.blink_config, transition)
    }

    fn start_break(&mut self, now: DateTime<Utc>) {
        self.state = InterventionState::BreakActive {
            ends_at: now + self.break_duration,
        };
    }

    fn finish_break(&mut self, now: DateTime<Utc>) {
        self.state = InterventionState::Idle;
        self.last_break_at = Some(now);
        self.next_break_at = now + break_interval(self.last_stress, &mut self.rng);
        // A break doubles as a blink reset
        self.schedule_next_blink(now);
    }

    fn schedule_next_blink(&mut self, base: DateTime<Utc>) {
        self.next_blink_at = if self.blink_config.enabled {
            base + blink_interval(&self.blink_config, &mut self.rng)
        } else {
            base + Duration::hours(DISABLED_BLINK_HOURS)
        };
    }
}
