//! Non-macOS (noop) input capture.
//!
//! Lets the agent build and run on targets without an input hook. The
//! engine still publishes well-formed zero-activity snapshots.

use crate::collector::{CollectorConfig, CollectorError, InputEvent, EVENT_CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A collector that never emits events.
pub struct NoopCollector {
    _config: CollectorConfig,
    _sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
}

impl NoopCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            _config: config,
            _sender: sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the collector as running. No hook is installed.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        tracing::warn!("no input hook on this platform; activity will read as zero");
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

/// There is no Input Monitoring permission gate off macOS.
pub fn check_permission() -> bool {
    true
}
