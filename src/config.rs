//! Configuration for the break agent.
//!
//! Values here are startup defaults for the agent process. Loaded files pass
//! through [`Config::validated`], and the engine clamps any blink config it is
//! handed, so a hand-edited file cannot put the scheduler into an invalid state.

use crate::core::snapshot::BlinkConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest tick or break length the service accepts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Main configuration for the break agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cadence of break/blink deadline checks
    #[serde(with = "duration_serde")]
    pub transition_interval: Duration,

    /// Cadence of snapshot sampling (and energy drain)
    #[serde(with = "duration_serde")]
    pub snapshot_interval: Duration,

    /// Length of a break
    #[serde(with = "duration_serde")]
    pub break_duration: Duration,

    /// Initial blink reminder settings
    pub blink: BlinkConfig,

    /// Which input sources to capture
    pub sources: SourceConfig,

    /// Per-subscriber buffer; messages beyond it are dropped for that subscriber
    pub subscriber_buffer: usize,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transition_interval: Duration::from_secs(1),
            snapshot_interval: Duration::from_secs(10),
            break_duration: Duration::from_secs(60),
            blink: BlinkConfig::default(),
            sources: SourceConfig::default(),
            subscriber_buffer: 64,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config.validated())
    }

    /// Raise zero or tiny durations and an empty subscriber buffer to usable
    /// minimums. A zero tick would spin the service and never drain energy.
    pub fn validated(mut self) -> Self {
        self.transition_interval = self.transition_interval.max(MIN_INTERVAL);
        self.snapshot_interval = self.snapshot_interval.max(MIN_INTERVAL);
        self.break_duration = self.break_duration.max(Duration::from_secs(1));
        self.subscriber_buffer = self.subscriber_buffer.max(1);
        self
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-break-agent")
            .join("config.json")
    }
}

/// Configuration for which input sources to capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub mouse: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            mouse: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            mouse: sources.iter().any(|s| s == "mouse" || s == "all"),
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.mouse
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,mouse");
        assert!(config.keyboard);
        assert!(config.mouse);

        let config = SourceConfig::from_csv("keyboard");
        assert!(config.keyboard);
        assert!(!config.mouse);

        let config = SourceConfig::from_csv("all");
        assert!(config.keyboard);
        assert!(config.mouse);

        assert!(!SourceConfig::from_csv("trackpad").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transition_interval, Duration::from_secs(1));
        assert_eq!(config.snapshot_interval, Duration::from_secs(10));
        assert_eq!(config.break_duration, Duration::from_secs(60));
        assert_eq!(config.blink, BlinkConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.break_duration = Duration::from_secs(90);
        config.blink.enabled = false;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "snapshot_interval": 5 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.snapshot_interval, Duration::from_secs(5));
        assert_eq!(config.transition_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_values_are_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "transition_interval": 0, "snapshot_interval": 0, "break_duration": 0, "subscriber_buffer": 0 }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.transition_interval >= MIN_INTERVAL);
        assert!(config.snapshot_interval >= MIN_INTERVAL);
        assert_eq!(config.break_duration, Duration::from_secs(1));
        assert_eq!(config.subscriber_buffer, 1);
    }

    #[test]
    fn test_validated_raises_in_memory_config() {
        let config = Config {
            transition_interval: Duration::ZERO,
            snapshot_interval: Duration::ZERO,
            ..Config::default()
        }
        .validated();
        assert_eq!(config.transition_interval, MIN_INTERVAL);
        assert_eq!(config.snapshot_interval, MIN_INTERVAL);
        assert_eq!(Config::default().validated(), Config::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
