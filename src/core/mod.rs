//! Core functionality for the break agent.
//!
//! This module contains:
//! - Sliding-window aggregation of input activity
//! - The stress and energy model
//! - Break/blink intervention scheduling
//! - The engine that composes them into published snapshots

pub mod aggregator;
pub mod clock;
pub mod model;
pub mod monitor;
pub mod scheduler;
pub mod snapshot;

// Re-export commonly used types
pub use aggregator::ActivityAggregator;
pub use clock::MonotonicClock;
pub use model::{drain_energy, stress_level};
pub use monitor::{MonitorSettings, Outbound, StressMonitor};
pub use scheduler::{
    blink_interval, break_interval, InterventionScheduler, InterventionState, Transition,
};
pub use snapshot::{BlinkConfig, OverlayMode, OverlayState, StressSnapshot, Toast};
