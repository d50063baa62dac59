//! The monitor service: a single-owner actor around [`StressMonitor`].
//!
//! One thread owns the engine and serialises everything that touches it:
//! user commands, input events, the fast transition tick and the slow
//! snapshot tick. Callers talk to it through a cloneable [`MonitorHandle`].
//! Published messages go out through per-type [`Broadcaster`]s so a slow
//! subscriber can never stall the engine.

use crate::collector::{Collector, CollectorConfig, CollectorError, InputEvent};
use crate::config::Config;
use crate::core::clock::MonotonicClock;
use crate::core::monitor::{MonitorSettings, Outbound, StressMonitor};
use crate::core::snapshot::{BlinkConfig, OverlayState, StressSnapshot, Toast};
use crate::hub::broadcast::{Broadcaster, Subscription};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Errors surfaced by the service boundary. The engine itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Monitor service is already running")]
    AlreadyRunning,
    #[error("Monitor service is not running")]
    Stopped,
    #[error("Input collector failed: {0}")]
    Collector(#[from] CollectorError),
}

enum Command {
    Input(InputEvent),
    RequestBreak,
    SkipBlink,
    SnoozeBlink,
    SetBlinkConfig(BlinkConfig, Sender<BlinkConfig>),
    Snapshot(Sender<StressSnapshot>),
    Shutdown,
}

/// The three outbound streams.
#[derive(Clone)]
struct Hubs {
    snapshots: Broadcaster<StressSnapshot>,
    overlays: Broadcaster<OverlayState>,
    toasts: Broadcaster<Toast>,
}

impl Hubs {
    fn new(capacity: usize) -> Self {
        Self {
            snapshots: Broadcaster::new(capacity),
            overlays: Broadcaster::new(capacity),
            toasts: Broadcaster::new(capacity),
        }
    }

    fn publish(&self, messages: Vec<Outbound>) {
        for message in messages {
            match message {
                Outbound::Snapshot(snapshot) => {
                    self.snapshots.publish(snapshot);
                }
                Outbound::Overlay(overlay) => {
                    tracing::info!(mode = %overlay.mode, "overlay state changed");
                    self.overlays.publish(overlay);
                }
                Outbound::Toast(toast) => {
                    self.toasts.publish(toast);
                }
            }
        }
    }
}

/// Cloneable front door to a running [`MonitorService`].
#[derive(Clone)]
pub struct MonitorHandle {
    commands: Sender<Command>,
    hubs: Hubs,
    running: Arc<AtomicBool>,
}

impl MonitorHandle {
    fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands.send(command).map_err(|_| ServiceError::Stopped)
    }

    fn query<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T, ServiceError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ServiceError::Stopped);
        }
        let (reply, response) = bounded(1);
        self.send(build(reply))?;
        response.recv().map_err(|_| ServiceError::Stopped)
    }

    /// Queue an input event from any producer thread.
    pub fn ingest(&self, event: InputEvent) -> Result<(), ServiceError> {
        self.send(Command::Input(event))
    }

    pub fn request_break(&self) -> Result<(), ServiceError> {
        self.send(Command::RequestBreak)
    }

    pub fn skip_blink(&self) -> Result<(), ServiceError> {
        self.send(Command::SkipBlink)
    }

    pub fn snooze_blink(&self) -> Result<(), ServiceError> {
        self.send(Command::SnoozeBlink)
    }

    /// Replace the blink config; returns the effective clamped config.
    pub fn set_blink_config(&self, config: BlinkConfig) -> Result<BlinkConfig, ServiceError> {
        self.query(|reply| Command::SetBlinkConfig(config, reply))
    }

    /// Current derived state, read on demand.
    pub fn snapshot(&self) -> Result<StressSnapshot, ServiceError> {
        self.query(Command::Snapshot)
    }

    pub fn subscribe_snapshots(&self) -> Subscription<StressSnapshot> {
        self.hubs.snapshots.subscribe()
    }

    pub fn subscribe_overlay(&self) -> Subscription<OverlayState> {
        self.hubs.overlays.subscribe()
    }

    pub fn subscribe_toasts(&self) -> Subscription<Toast> {
        self.hubs.toasts.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Owns the actor thread and, optionally, the input collector.
pub struct MonitorService {
    handle: MonitorHandle,
    inbox: Option<Receiver<Command>>,
    input: Option<Receiver<InputEvent>>,
    collector: Option<Collector>,
    config: Config,
    transparency: SharedTransparencyLog,
    thread: Option<JoinHandle<()>>,
}

impl MonitorService {
    pub fn new(config: Config) -> Self {
        let config = config.validated();
        let (commands, inbox) = unbounded();
        Self {
            handle: MonitorHandle {
                commands,
                hubs: Hubs::new(config.subscriber_buffer),
                running: Arc::new(AtomicBool::new(false)),
            },
            inbox: Some(inbox),
            input: None,
            collector: None,
            config,
            transparency: create_shared_log(),
            thread: None,
        }
    }

    /// Capture OS input with the platform collector once started.
    pub fn with_collector(mut self) -> Self {
        let collector = Collector::new(CollectorConfig::from(&self.config.sources));
        self.input = Some(collector.receiver().clone());
        self.collector = Some(collector);
        self
    }

    /// Consume events from an external producer channel.
    pub fn with_input(mut self, input: Receiver<InputEvent>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn transparency(&self) -> &SharedTransparencyLog {
        &self.transparency
    }

    /// Begin consuming input and polling. A stopped service cannot be restarted.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.thread.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }
        if self.inbox.is_none() {
            return Err(ServiceError::Stopped);
        }
        if let Some(collector) = self.collector.as_mut() {
            collector.start()?;
        }
        let inbox = self.inbox.take().ok_or(ServiceError::Stopped)?;

        let clock = MonotonicClock::new();
        let monitor = StressMonitor::new(clock.now(), MonitorSettings::from(&self.config))
            .with_transparency(Arc::clone(&self.transparency));
        tracing::info!(session_id = %monitor.session_id(), "monitor starting");

        let actor = Actor {
            monitor,
            clock,
            hubs: self.handle.hubs.clone(),
            inbox,
            input: self.input.take(),
            transition_interval: self.config.transition_interval,
            snapshot_interval: self.config.snapshot_interval,
        };

        self.handle.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.handle.running);
        self.thread = Some(thread::spawn(move || {
            actor.run();
            running.store(false, Ordering::SeqCst);
        }));
        Ok(())
    }

    /// Cease all timers and listeners. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.commands.send(Command::Shutdown);
            if thread.join().is_err() {
                tracing::error!("monitor thread panicked");
            }
            tracing::info!("monitor stopped");
        }
        if let Some(collector) = self.collector.as_mut() {
            collector.stop();
        }
        // Also retires a service that was never started
        self.inbox = None;
        self.handle.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Actor {
    monitor: StressMonitor,
    clock: MonotonicClock,
    hubs: Hubs,
    inbox: Receiver<Command>,
    input: Option<Receiver<InputEvent>>,
    transition_interval: Duration,
    snapshot_interval: Duration,
}

impl Actor {
    fn run(mut self) {
        let transition_tick = tick(self.transition_interval);
        let snapshot_tick = tick(self.snapshot_interval);
        let inbox = self.inbox.clone();
        let mut input = self.input.take().unwrap_or_else(never);

        let now = self.clock.now();
        let overlay = self.monitor.overlay_state();
        self.hubs.publish(vec![Outbound::Overlay(overlay)]);
        let initial = self.monitor.sample(now);
        self.hubs.publish(initial);

        loop {
            let mut input_closed = false;
            select! {
                recv(inbox) -> command => match command {
                    Ok(Command::Shutdown) | Err(_) => break,
                    Ok(command) => self.handle(command),
                },
                recv(input) -> event => match event {
                    Ok(event) => self.ingest(event),
                    Err(_) => input_closed = true,
                },
                recv(transition_tick) -> _ => {
                    let out = self.monitor.check_transitions(self.clock.now());
                    self.hubs.publish(out);
                },
                recv(snapshot_tick) -> _ => {
                    let out = self.monitor.sample(self.clock.now());
                    self.hubs.publish(out);
                },
            }
            if input_closed {
                tracing::warn!("input source disconnected; continuing without input");
                input = never();
            }
        }
    }

    /// Events are restamped on arrival so the engine sees a single clock.
    fn ingest(&mut self, event: InputEvent) {
        let event = InputEvent {
            timestamp: self.clock.now(),
            ..event
        };
        self.monitor.ingest(&event);
    }

    fn handle(&mut self, command: Command) {
        let now = self.clock.now();
        let out = match command {
            Command::Input(event) => {
                self.ingest(event);
                Vec::new()
            }
            Command::RequestBreak => self.monitor.request_break(now),
            Command::SkipBlink => self.monitor.skip_blink(now),
            Command::SnoozeBlink => self.monitor.snooze_blink(now),
            Command::SetBlinkConfig(config, reply) => {
                let (effective, out) = self.monitor.set_blink_config(config, now);
                let _ = reply.send(effective);
                out
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.monitor.snapshot(now));
                Vec::new()
            }
            Command::Shutdown => Vec::new(),
        };
        self.hubs.publish(out);
    }
}
