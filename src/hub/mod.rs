//! Snapshot and broadcast hub.
//!
//! Runs the engine on its own thread, drives the transition and snapshot
//! cadences, and fans published state out to subscribers.

pub mod broadcast;
pub mod service;

pub use broadcast::{Broadcaster, Subscription, SubscriptionId};
pub use service::{MonitorHandle, MonitorService, ServiceError};
