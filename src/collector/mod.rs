//! Input capture for the break agent.
//!
//! The engine only consumes a stream of [`InputEvent`]s. This module provides
//! the platform capture that produces them: a CoreGraphics event tap on macOS
//! and a silent collector elsewhere.

pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod noop;

pub use types::{InputEvent, InputKind};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "macos")]
pub type Collector = MacOSCollector;

#[cfg(not(target_os = "macos"))]
pub use noop::{check_permission, NoopCollector};

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "macos"))]
pub type Collector = NoopCollector;

/// Capacity of the collector's event channel. Events are dropped when full.
pub const EVENT_CHANNEL_CAPACITY: usize = 10_000;

/// Configuration for which event sources to capture.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

impl From<&crate::config::SourceConfig> for CollectorConfig {
    fn from(sources: &crate::config::SourceConfig) -> Self {
        Self {
            capture_keyboard: sources.keyboard,
            capture_mouse: sources.mouse,
        }
    }
}

/// Errors that can occur during event collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,
    #[error("Input Monitoring permission not granted")]
    PermissionDenied,
    #[error("Failed to create CGEvent tap")]
    TapCreationFailed,
    #[error("Failed to create run loop source")]
    RunLoopSourceFailed,
}
