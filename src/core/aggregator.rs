//! Sliding-window aggregation of input activity.
//!
//! Keys and pointer movement are retained for a trailing 60-second window.
//! Pruning is lazy: every read prunes first, so retained samples are always
//! inside the window relative to the `now` of the last read. Scrolling is
//! tracked as a streak (start + last scroll) rather than a list.

use crate::collector::types::{InputEvent, InputKind};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Length of the activity window used for per-minute rates, in seconds.
pub const ACTIVITY_WINDOW_SECS: i64 = 60;

/// A scroll gap of this many seconds ends the current streak.
pub const SCROLL_STREAK_GAP_SECS: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MouseSample {
    at: DateTime<Utc>,
    distance: f64,
}

/// Aggregates raw input into activity rates.
#[derive(Debug, Default)]
pub struct ActivityAggregator {
    /// Key press timestamps, oldest first
    keys: VecDeque<DateTime<Utc>>,
    /// Pointer travel samples, oldest first
    mouse: VecDeque<MouseSample>,
    /// Reference position for the next pointer delta
    last_position: Option<(f64, f64)>,
    /// Pointer travel since start, never pruned
    total_mouse_distance: f64,
    last_scroll_at: Option<DateTime<Utc>>,
    scroll_streak_start: Option<DateTime<Utc>>,
}

impl ActivityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch an input event to the matching recorder.
    pub fn record(&mut self, event: &InputEvent) {
        match event.kind {
            InputKind::Key => self.record_key(event.timestamp),
            InputKind::MouseMove { x, y } => self.record_mouse_move(x, y, event.timestamp),
            InputKind::Scroll => self.record_scroll(event.timestamp),
        }
    }

    pub fn record_key(&mut self, now: DateTime<Utc>) {
        self.keys.push_back(now);
    }

    /// Record a pointer position.
    ///
    /// The distance from the previous position is windowed and added to the
    /// running total. The first position only sets the reference point. A
    /// non-finite distance is discarded but still moves the reference.
    pub fn record_mouse_move(&mut self, x: f64, y: f64, now: DateTime<Utc>) {
        if let Some((last_x, last_y)) = self.last_position {
            let distance = (x - last_x).hypot(y - last_y);
            if distance.is_finite() {
                self.total_mouse_distance += distance;
                self.mouse.push_back(MouseSample { at: now, distance });
            } else {
                tracing::debug!("discarding non-finite pointer delta");
            }
        }
        self.last_position = Some((x, y));
    }

    pub fn record_scroll(&mut self, now: DateTime<Utc>) {
        let streak_broken = match self.last_scroll_at {
            Some(last) => now - last > Duration::seconds(SCROLL_STREAK_GAP_SECS),
            None => true,
        };
        if streak_broken || self.scroll_streak_start.is_none() {
            self.scroll_streak_start = Some(now);
        }
        self.last_scroll_at = Some(now);
    }

    /// Key presses in the trailing window.
    pub fn keys_per_minute(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.keys.len()
    }

    /// Pointer travel in the trailing window.
    pub fn mouse_distance_per_minute(&mut self, now: DateTime<Utc>) -> f64 {
        self.prune(now);
        self.mouse.iter().map(|sample| sample.distance).sum()
    }

    pub fn cumulative_mouse_distance(&self) -> f64 {
        self.total_mouse_distance
    }

    /// Length of the current scroll streak, or zero once the streak has lapsed.
    pub fn scroll_streak_duration(&self, now: DateTime<Utc>) -> Duration {
        let gap = Duration::seconds(SCROLL_STREAK_GAP_SECS);
        match (self.scroll_streak_start, self.last_scroll_at) {
            (Some(start), Some(last)) if now - last < gap => now - start,
            _ => Duration::zero(),
        }
    }

    /// Number of samples currently held across both windows.
    #[cfg(test)]
    fn retained_samples(&self) -> usize {
        self.keys.len() + self.mouse.len()
    }

    /// Drop samples older than the activity window.
    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(ACTIVITY_WINDOW_SECS);
        while self.keys.front().is_some_and(|&at| at < cutoff) {
            self.keys.pop_front();
        }
        while self.mouse.front().is_some_and(|sample| sample.at < cutoff) {
            self.mouse.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_empty_aggregator_reads_zero() {
        let mut agg = ActivityAggregator::new();
        assert_eq!(agg.keys_per_minute(t0()), 0);
        assert_eq!(agg.mouse_distance_per_minute(t0()), 0.0);
        assert_eq!(agg.cumulative_mouse_distance(), 0.0);
        assert_eq!(agg.scroll_streak_duration(t0()), Duration::zero());
    }

    #[test]
    fn test_keys_outside_window_are_pruned() {
        let mut agg = ActivityAggregator::new();
        agg.record_key(t0());
        agg.record_key(t0() + Duration::seconds(30));
        agg.record_key(t0() + Duration::seconds(50));

        assert_eq!(agg.keys_per_minute(t0() + Duration::seconds(60)), 3);
        assert_eq!(agg.keys_per_minute(t0() + Duration::seconds(61)), 2);
        assert_eq!(agg.keys_per_minute(t0() + Duration::seconds(200)), 0);
        assert_eq!(agg.retained_samples(), 0);
    }

    #[test]
    fn test_first_move_sets_reference_only() {
        let mut agg = ActivityAggregator::new();
        agg.record_mouse_move(10.0, 10.0, t0());
        assert_eq!(agg.mouse_distance_per_minute(t0()), 0.0);

        agg.record_mouse_move(13.0, 14.0, t0() + Duration::seconds(1));
        agg.record_mouse_move(13.0, 24.0, t0() + Duration::seconds(2));
        let now = t0() + Duration::seconds(2);
        assert!((agg.mouse_distance_per_minute(now) - 15.0).abs() < 1e-9);
        assert!((agg.cumulative_mouse_distance() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_distance_survives_pruning() {
        let mut agg = ActivityAggregator::new();
        agg.record_mouse_move(0.0, 0.0, t0());
        agg.record_mouse_move(0.0, 100.0, t0());

        let later = t0() + Duration::minutes(5);
        assert_eq!(agg.mouse_distance_per_minute(later), 0.0);
        assert!((agg.cumulative_mouse_distance() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_distance_discarded_but_moves_reference() {
        let mut agg = ActivityAggregator::new();
        agg.record_mouse_move(0.0, 0.0, t0());
        agg.record_mouse_move(f64::INFINITY, 0.0, t0());
        assert_eq!(agg.mouse_distance_per_minute(t0()), 0.0);
        assert_eq!(agg.cumulative_mouse_distance(), 0.0);

        // Reference is now non-finite, so the following delta is discarded too
        agg.record_mouse_move(5.0, 0.0, t0());
        assert_eq!(agg.mouse_distance_per_minute(t0()), 0.0);

        agg.record_mouse_move(5.0, 7.0, t0());
        assert!((agg.mouse_distance_per_minute(t0()) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_scroll_streak_continues_and_lapses() {
        let mut agg = ActivityAggregator::new();
        agg.record_scroll(t0());
        agg.record_scroll(t0() + Duration::seconds(15));
        agg.record_scroll(t0() + Duration::seconds(30));

        let now = t0() + Duration::seconds(40);
        assert_eq!(agg.scroll_streak_duration(now), Duration::seconds(40));

        // Gap reached: streak reads as ended
        let lapsed = t0() + Duration::seconds(50);
        assert_eq!(agg.scroll_streak_duration(lapsed), Duration::zero());
    }

    #[test]
    fn test_scroll_after_long_gap_starts_new_streak() {
        let mut agg = ActivityAggregator::new();
        agg.record_scroll(t0());
        agg.record_scroll(t0() + Duration::seconds(10));
        agg.record_scroll(t0() + Duration::seconds(31));

        let now = t0() + Duration::seconds(35);
        assert_eq!(agg.scroll_streak_duration(now), Duration::seconds(4));
    }

    #[test]
    fn test_record_dispatches_by_kind() {
        let mut agg = ActivityAggregator::new();
        agg.record(&InputEvent::key_at(t0()));
        agg.record(&InputEvent::mouse_move_at(0.0, 0.0, t0()));
        agg.record(&InputEvent::mouse_move_at(6.0, 8.0, t0()));
        agg.record(&InputEvent::scroll_at(t0()));

        let now = t0() + Duration::seconds(1);
        assert_eq!(agg.keys_per_minute(now), 1);
        assert!((agg.mouse_distance_per_minute(now) - 10.0).abs() < 1e-9);
        assert_eq!(agg.scroll_streak_duration(now), Duration::seconds(1));
    }
}
