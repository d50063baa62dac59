//! Transparency module for the break agent.
//!
//! Exposes what the agent observed during the current session.

pub mod log;

pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
