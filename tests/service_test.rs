//! Integration tests for the threaded monitor service.

use chrono::Utc;
use crossbeam_channel::unbounded;
use std::time::Duration;
use synheart_break_agent::{
    BlinkConfig, Config, InputEvent, MonitorService, OverlayMode, OverlayState, ServiceError,
    Subscription,
};

const WAIT: Duration = Duration::from_secs(3);

fn fast_config() -> Config {
    Config {
        transition_interval: Duration::from_millis(20),
        snapshot_interval: Duration::from_millis(50),
        ..Config::default()
    }
}

fn wait_for_mode(overlay: &Subscription<OverlayState>, mode: OverlayMode) -> OverlayState {
    loop {
        let state = overlay
            .recv_timeout(WAIT)
            .expect("overlay state not published in time");
        if state.mode == mode {
            return state;
        }
    }
}

#[test]
fn test_initial_overlay_and_snapshots_published() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    let overlay = handle.subscribe_overlay();
    let snapshots = handle.subscribe_snapshots();

    service.start().unwrap();

    let initial = overlay.recv_timeout(WAIT).unwrap();
    assert_eq!(initial.mode, OverlayMode::Normal);
    assert!(!initial.breathing_active);

    let first = snapshots.recv_timeout(WAIT).unwrap();
    let second = snapshots.recv_timeout(WAIT).unwrap();
    assert_eq!(first.session_id, second.session_id);
    assert!(second.taken_at >= first.taken_at);
    assert!(first.energy > 99.9);

    service.stop();
}

#[test]
fn test_request_break_shows_break_overlay() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    let overlay = handle.subscribe_overlay();
    service.start().unwrap();

    handle.request_break().unwrap();
    let state = wait_for_mode(&overlay, OverlayMode::Break);
    assert!(state.breathing_active);
    assert!(state.break_ends_at.is_some());
    assert!(handle.snapshot().unwrap().is_break_active);

    service.stop();
    assert_eq!(service.transparency().stats().breaks_started, 1);
}

#[test]
fn test_set_blink_config_returns_clamped() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    service.start().unwrap();

    let effective = handle
        .set_blink_config(BlinkConfig {
            enabled: true,
            min_minutes: 90.0,
            max_minutes: 10.0,
            duration_seconds: 6.4,
            snooze_minutes: 0.0,
        })
        .unwrap();
    assert_eq!(effective.min_minutes, 60.0);
    assert_eq!(effective.max_minutes, 60.0);
    assert_eq!(effective.duration_seconds, 6.0);
    assert_eq!(effective.snooze_minutes, 1.0);

    service.stop();
}

#[test]
fn test_ingested_events_reach_snapshot() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    service.start().unwrap();

    for _ in 0..3 {
        handle.ingest(InputEvent::key()).unwrap();
    }
    handle.ingest(InputEvent::mouse_move(0.0, 0.0)).unwrap();
    handle.ingest(InputEvent::mouse_move(30.0, 40.0)).unwrap();

    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.kpm, 3);
    assert_eq!(snapshot.total_mouse_distance, 50.0);

    service.stop();
    let stats = service.transparency().stats();
    assert_eq!(stats.key_events, 3);
    assert_eq!(stats.mouse_events, 2);
}

#[test]
fn test_external_input_channel() {
    let (sender, receiver) = unbounded();
    let mut service = MonitorService::new(fast_config()).with_input(receiver);
    let handle = service.handle();
    service.start().unwrap();

    sender.send(InputEvent::key()).unwrap();
    sender.send(InputEvent::key()).unwrap();
    drop(sender);

    // Input arrives on its own channel, so poll until it has been consumed
    let mut kpm = 0;
    for _ in 0..100 {
        kpm = handle.snapshot().unwrap().kpm;
        if kpm == 2 {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(kpm, 2);

    // A closed input channel does not stop the service
    assert!(handle.is_running());
    service.stop();
}

#[test]
fn test_unsubscribed_listener_does_not_affect_others() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    let kept = handle.subscribe_snapshots();
    let dropped = handle.subscribe_snapshots();
    service.start().unwrap();

    dropped.unsubscribe();
    for _ in 0..3 {
        kept.recv_timeout(WAIT).unwrap();
    }

    service.stop();
}

#[test]
fn test_commands_fail_after_stop() {
    let mut service = MonitorService::new(fast_config());
    let handle = service.handle();
    service.start().unwrap();
    service.stop();

    assert!(!handle.is_running());
    assert!(matches!(handle.request_break(), Err(ServiceError::Stopped)));
    assert!(matches!(handle.snapshot(), Err(ServiceError::Stopped)));
}

#[test]
fn test_future_stamped_input_does_not_stall_break() {
    let (sender, receiver) = unbounded();
    let config = Config {
        break_duration: Duration::from_secs(1),
        ..fast_config()
    };
    let mut service = MonitorService::new(config).with_input(receiver);
    let handle = service.handle();
    let overlay = handle.subscribe_overlay();
    service.start().unwrap();

    // A producer clock an hour ahead, as after a forward wall-clock step
    let ahead = Utc::now() + chrono::Duration::hours(1);
    sender.send(InputEvent::key_at(ahead)).unwrap();
    handle
        .ingest(InputEvent::key_at(ahead + chrono::Duration::seconds(1)))
        .unwrap();

    handle.request_break().unwrap();
    wait_for_mode(&overlay, OverlayMode::Break);
    wait_for_mode(&overlay, OverlayMode::Normal);

    let snapshot = handle.snapshot().unwrap();
    assert!(snapshot.last_break_at.is_some());
    assert!(snapshot.taken_at < ahead);
    assert_eq!(snapshot.kpm, 2);

    service.stop();
}

#[test]
fn test_zero_intervals_still_drain_energy() {
    let config = Config {
        transition_interval: Duration::ZERO,
        snapshot_interval: Duration::ZERO,
        ..Config::default()
    };
    let mut service = MonitorService::new(config);
    let handle = service.handle();
    let snapshots = handle.subscribe_snapshots();
    service.start().unwrap();

    let first = snapshots.recv_timeout(WAIT).unwrap();
    assert!(first.energy < 100.0);

    // The command inbox stays responsive
    assert!(handle.snapshot().is_ok());
    service.stop();
}
