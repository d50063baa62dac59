//! Input event types consumed by the break agent.
//!
//! Events carry a timestamp and, for pointer movement, the pointer position.
//! Positions are only used to derive the distance travelled since the
//! previous event and are never retained beyond that reference point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of input happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InputKind {
    /// A key was pressed (no key code is captured)
    Key,
    /// The pointer moved to an absolute position
    MouseMove { x: f64, y: f64 },
    /// A scroll wheel or trackpad scroll
    Scroll,
}

/// A single timestamped input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: InputKind,
}

impl InputEvent {
    pub fn key_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: InputKind::Key,
        }
    }

    pub fn mouse_move_at(x: f64, y: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: InputKind::MouseMove { x, y },
        }
    }

    pub fn scroll_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: InputKind::Scroll,
        }
    }

    /// A key press stamped with the current time.
    pub fn key() -> Self {
        Self::key_at(Utc::now())
    }

    /// A pointer move stamped with the current time.
    pub fn mouse_move(x: f64, y: f64) -> Self {
        Self::mouse_move_at(x, y, Utc::now())
    }

    /// A scroll stamped with the current time.
    pub fn scroll() -> Self {
        Self::scroll_at(Utc::now())
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self.kind, InputKind::Key)
    }
}
