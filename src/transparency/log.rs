//! Session transparency log.
//!
//! Counts what the agent ingested and which interventions it ran during the
//! current session, so users can see exactly what was observed. Nothing is
//! written to disk; the counters die with the process.

use crate::collector::types::InputKind;
use crate::core::scheduler::Transition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Session counters. All updates are relaxed atomics; readers get a
/// best-effort consistent view.
#[derive(Debug)]
pub struct TransparencyLog {
    key_events: AtomicU64,
    mouse_events: AtomicU64,
    scroll_events: AtomicU64,
    snapshots_published: AtomicU64,
    breaks_started: AtomicU64,
    breaks_completed: AtomicU64,
    blinks_shown: AtomicU64,
    blinks_skipped: AtomicU64,
    blinks_snoozed: AtomicU64,
    toasts_sent: AtomicU64,
    session_start: DateTime<Utc>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            key_events: AtomicU64::new(0),
            mouse_events: AtomicU64::new(0),
            scroll_events: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            breaks_started: AtomicU64::new(0),
            breaks_completed: AtomicU64::new(0),
            blinks_shown: AtomicU64::new(0),
            blinks_skipped: AtomicU64::new(0),
            blinks_snoozed: AtomicU64::new(0),
            toasts_sent: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_input(&self, kind: &InputKind) {
        let counter = match kind {
            InputKind::Key => &self.key_events,
            InputKind::MouseMove { .. } => &self.mouse_events,
            InputKind::Scroll => &self.scroll_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_toast(&self) {
        self.toasts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transition(&self, transition: &Transition) {
        let counter = match transition {
            Transition::BreakStarted { .. } => &self.breaks_started,
            Transition::BreakFinished => &self.breaks_completed,
            Transition::BlinkStarted => &self.blinks_shown,
            Transition::BlinkSkipped => &self.blinks_skipped,
            Transition::BlinkSnoozed => &self.blinks_snoozed,
            Transition::BlinkFinished | Transition::BlinkCanceled => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            key_events: self.key_events.load(Ordering::Relaxed),
            mouse_events: self.mouse_events.load(Ordering::Relaxed),
            scroll_events: self.scroll_events.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            breaks_started: self.breaks_started.load(Ordering::Relaxed),
            breaks_completed: self.breaks_completed.load(Ordering::Relaxed),
            blinks_shown: self.blinks_shown.load(Ordering::Relaxed),
            blinks_skipped: self.blinks_skipped.load(Ordering::Relaxed),
            blinks_snoozed: self.blinks_snoozed.load(Ordering::Relaxed),
            toasts_sent: self.toasts_sent.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable report for the end of a session.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Key presses observed: {}\n\
             - Pointer moves observed: {}\n\
             - Scroll events observed: {}\n\
             - Snapshots published: {}\n\
             - Breaks started / completed: {} / {}\n\
             - Blink reminders shown: {} (skipped {}, snoozed {})\n\
             - Toasts sent: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No key content captured\n\
             - Pointer positions used only for distance, never stored\n\
             - Nothing persisted after the session ends",
            stats.key_events,
            stats.mouse_events,
            stats.scroll_events,
            stats.snapshots_published,
            stats.breaks_started,
            stats.breaks_completed,
            stats.blinks_shown,
            stats.blinks_skipped,
            stats.blinks_snoozed,
            stats.toasts_sent,
            stats.session_duration_secs
        )
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub key_events: u64,
    pub mouse_events: u64,
    pub scroll_events: u64,
    pub snapshots_published: u64,
    pub breaks_started: u64,
    pub breaks_completed: u64,
    pub blinks_shown: u64,
    pub blinks_skipped: u64,
    pub blinks_snoozed: u64,
    pub toasts_sent: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}
