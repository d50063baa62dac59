//! macOS input capture using a CGEvent tap.
//!
//! The tap is listen-only and lives on its own thread with a Core Foundation
//! run loop. It requires the Input Monitoring permission.

use crate::collector::{CollectorConfig, CollectorError, InputEvent, EVENT_CHANNEL_CAPACITY};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The macOS input collector.
pub struct MacOSCollector {
    config: CollectorConfig,
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MacOSCollector {
    pub fn new(config: CollectorConfig) -> Self {
        // Bounded so a stalled consumer cannot grow memory without limit
        let (sender, receiver) = bounded(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start capturing events in a background thread.
    ///
    /// Fails with [`CollectorError::PermissionDenied`] when Input Monitoring
    /// has not been granted.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.is_running() {
            return Err(CollectorError::AlreadyRunning);
        }
        if !check_permission() {
            return Err(CollectorError::PermissionDenied);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let sender = self.sender.clone();
        let running = self.running.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            if let Err(e) = run_event_loop(sender, running.clone(), config) {
                tracing::error!(error = %e, "event tap loop failed");
            }
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing events and join the tap thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

impl Drop for MacOSCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_event_types(config: &CollectorConfig) -> Vec<CGEventType> {
    let mut types = Vec::new();

    if config.capture_keyboard {
        types.push(CGEventType::KeyDown);
    }

    if config.capture_mouse {
        types.push(CGEventType::MouseMoved);
        types.push(CGEventType::LeftMouseDragged);
        types.push(CGEventType::RightMouseDragged);
        types.push(CGEventType::ScrollWheel);
    }

    types
}

fn run_event_loop(
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    config: CollectorConfig,
) -> Result<(), CollectorError> {
    let event_types = build_event_types(&config);

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        event_types,
        move |_proxy, event_type, event| {
            if let Some(input) = convert_cg_event(event_type, event) {
                // Never block the tap; a full channel drops the event
                let _ = sender.try_send(input);
            }
            CallbackResult::Keep
        },
    )
    .map_err(|_| CollectorError::TapCreationFailed)?;

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|_| CollectorError::RunLoopSourceFailed)?;

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }

    tap.enable();
    tracing::info!("event tap enabled");

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            std::time::Duration::from_millis(100),
            false,
        );
    }

    Ok(())
}

/// Convert a CGEvent into an [`InputEvent`]. Key codes are never read.
fn convert_cg_event(event_type: CGEventType, event: &CGEvent) -> Option<InputEvent> {
    use core_graphics::event::CGEventType::*;

    match event_type {
        KeyDown => Some(InputEvent::key()),
        MouseMoved | LeftMouseDragged | RightMouseDragged => {
            let location = event.location();
            Some(InputEvent::mouse_move(location.x, location.y))
        }
        ScrollWheel => Some(InputEvent::scroll()),
        _ => None,
    }
}

/// Check if the application has Input Monitoring permission.
///
/// macOS has no direct query for this; creating a passive tap fails when
/// permission is missing.
pub fn check_permission() -> bool {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types_follow_sources() {
        let keyboard_only = CollectorConfig {
            capture_keyboard: true,
            capture_mouse: false,
        };
        let types = build_event_types(&keyboard_only);
        assert_eq!(types.len(), 1);

        let all = build_event_types(&CollectorConfig::default());
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_start_reports_missing_permission() {
        let mut collector = MacOSCollector::new(CollectorConfig::default());
        if check_permission() {
            collector.start().unwrap();
            assert!(collector.is_running());
            collector.stop();
        } else {
            assert!(matches!(
                collector.start(),
                Err(CollectorError::PermissionDenied)
            ));
            assert!(!collector.is_running());
        }
    }
}
