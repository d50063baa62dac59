//! Synheart Break Agent - activity-aware break and blink reminders.
//!
//! This library watches keyboard and pointer rhythm, derives a live stress
//! and energy signal, and schedules two independent wellbeing interventions:
//! periodic rest breaks and eye-blink reminders.
//!
//! # Privacy Guarantees
//!
//! - **No key content**: Only the timing of key presses is observed
//! - **No position history**: Pointer positions are used for distance and dropped
//! - **No raw storage**: Raw events leave memory once they age out of the 60s window
//! - **No persistence**: Nothing about the session is written to disk
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Synheart Break Agent                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Collector  │──▶│ Aggregator  │──▶│ Stress/     │         │
//! │  │  (macOS)    │   │ (60s window)│   │ Energy model│         │
//! │  └─────────────┘   └─────────────┘   └──────┬──────┘         │
//! │                                             ▼                │
//! │  user commands ─────────────────────▶ ┌─────────────┐        │
//! │                                       │  Scheduler  │        │
//! │                                       │ break/blink │        │
//! │                                       └──────┬──────┘        │
//! │                                              ▼               │
//! │            snapshots / overlay / toasts ◀── Hub              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use synheart_break_agent::{Config, MonitorService};
//!
//! let mut service = MonitorService::new(Config::default()).with_collector();
//! let handle = service.handle();
//! let overlay = handle.subscribe_overlay();
//!
//! service.start().expect("Failed to start monitor");
//! handle.request_break().expect("monitor stopped");
//! let state = overlay.recv_timeout(std::time::Duration::from_secs(2));
//! service.stop();
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod hub;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorConfig, CollectorError, InputEvent, InputKind};
pub use config::{Config, ConfigError, SourceConfig};
pub use core::{
    BlinkConfig, MonitorSettings, OverlayMode, OverlayState, StressMonitor, StressSnapshot, Toast,
};
pub use hub::{MonitorHandle, MonitorService, ServiceError, Subscription};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║           SYNHEART BREAK AGENT - PRIVACY DECLARATION             ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent watches your input rhythm to time rest breaks.       ║
║                                                                  ║
║  ✓ WHAT WE OBSERVE:                                              ║
║    • When keys are pressed (timing only)                         ║
║    • How far the pointer travels (distance only)                 ║
║    • When you scroll (timing only)                               ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Which keys you press (no passwords, messages, etc.)         ║
║    • A history of where your cursor has been                     ║
║    • What applications you use                                   ║
║    • Any screen content                                          ║
║                                                                  ║
║  Everything stays in memory. Activity older than 60 seconds      ║
║  is discarded, and nothing is saved when the agent stops.        ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
