//! Value types published by the break agent.
//!
//! Everything here is immutable once built. A [`StressSnapshot`] is rebuilt
//! whole on every sample; it is never patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-controlled blink reminder parameters.
///
/// Numeric fields are accepted as floats so that values coming from a UI can
/// be rounded and clamped rather than rejected. See [`BlinkConfig::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkConfig {
    pub enabled: bool,
    /// Shortest gap between reminders, in minutes
    pub min_minutes: f64,
    /// Longest gap between reminders, in minutes
    pub max_minutes: f64,
    /// How long a reminder stays on screen, in seconds
    pub duration_seconds: f64,
    /// Delay applied by a snooze, in minutes
    pub snooze_minutes: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_minutes: 8.0,
            max_minutes: 18.0,
            duration_seconds: 6.0,
            snooze_minutes: 3.0,
        }
    }
}

fn round_clamp(value: f64, min: f64, max: f64) -> f64 {
    // NaN rounds to NaN; max() then maps it to the lower bound
    value.round().max(min).min(max)
}

impl BlinkConfig {
    pub const MIN_MINUTES_RANGE: (f64, f64) = (2.0, 60.0);
    pub const MAX_MINUTES_CEILING: f64 = 120.0;
    pub const DURATION_SECONDS_RANGE: (f64, f64) = (3.0, 20.0);
    pub const SNOOZE_MINUTES_RANGE: (f64, f64) = (1.0, 20.0);

    /// Round every numeric field and clamp it into its allowed range.
    ///
    /// `max_minutes` is clamped against the already-clamped `min_minutes`,
    /// so the result always satisfies `min_minutes <= max_minutes`.
    pub fn clamped(&self) -> Self {
        let (min_lo, min_hi) = Self::MIN_MINUTES_RANGE;
        let min_minutes = round_clamp(self.min_minutes, min_lo, min_hi);
        let max_minutes = round_clamp(self.max_minutes, min_minutes, Self::MAX_MINUTES_CEILING);
        let (dur_lo, dur_hi) = Self::DURATION_SECONDS_RANGE;
        let (snooze_lo, snooze_hi) = Self::SNOOZE_MINUTES_RANGE;

        Self {
            enabled: self.enabled,
            min_minutes,
            max_minutes,
            duration_seconds: round_clamp(self.duration_seconds, dur_lo, dur_hi),
            snooze_minutes: round_clamp(self.snooze_minutes, snooze_lo, snooze_hi),
        }
    }
}

/// Which intervention, if any, the overlay should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    Normal,
    Break,
    Blink,
}

impl std::fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayMode::Normal => write!(f, "normal"),
            OverlayMode::Break => write!(f, "break"),
            OverlayMode::Blink => write!(f, "blink"),
        }
    }
}

/// Discrete overlay state, published whenever the mode changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayState {
    pub mode: OverlayMode,
    pub break_ends_at: Option<DateTime<Utc>>,
    pub blink_ends_at: Option<DateTime<Utc>>,
    /// The breathing guide runs for the whole break
    pub breathing_active: bool,
}

/// Short advisory message. Has no effect on scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Point-in-time view of everything the agent derives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSnapshot {
    /// Agent session this snapshot belongs to
    pub session_id: Uuid,
    pub taken_at: DateTime<Utc>,
    /// Key presses in the last 60 seconds
    pub kpm: u32,
    /// Pointer travel in the last 60 seconds
    pub mouse_distance_per_min: f64,
    /// Pointer travel since the agent started
    pub total_mouse_distance: f64,
    /// 0-100
    pub energy: f64,
    /// 0-1
    pub stress_level: f64,
    pub is_break_active: bool,
    pub break_ends_at: Option<DateTime<Utc>>,
    pub is_blink_active: bool,
    pub blink_ends_at: Option<DateTime<Utc>>,
    pub next_break_at: DateTime<Utc>,
    pub next_blink_at: DateTime<Utc>,
    pub last_break_at: Option<DateTime<Utc>>,
    /// Length of the current scroll streak in milliseconds, 0 when none
    pub scrolling_streak_ms: i64,
}
