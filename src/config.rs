//! Configuration for the activity recorder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sink::DEFAULT_FLUSH_THRESHOLD;
use crate::sources::screenshot::MIN_INTERVAL_SECS;

/// Main configuration for the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Path of the activity log file.
    pub log_path: PathBuf,

    /// Flush the in-memory recording buffer at this many characters.
    pub flush_threshold: usize,

    /// Which capture sources to activate.
    pub sources: SourceToggles,

    /// Screenshot capture settings.
    pub screenshots: ScreenshotSettings,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activity-recorder");

        Self {
            log_path: data_dir.join("activity.log"),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            sources: SourceToggles::default(),
            screenshots: ScreenshotSettings {
                interval_secs: 5,
                idle_pause_secs: 60,
                change_debounce_secs: 5,
                capture_delay_secs: 2,
                timing: TimingMode::FixedInterval,
                output: OutputMode::FilePath,
                output_dir: data_dir.join("screenshots"),
            },
        }
    }
}

impl RecorderConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: RecorderConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config.normalized())
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Path of the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("activity-recorder")
            .join("config.json")
    }

    /// Ensure the log's parent directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        Ok(())
    }

    /// Clamp out-of-range values, warning about anything that changed.
    pub fn normalized(mut self) -> Self {
        if self.screenshots.interval_secs < MIN_INTERVAL_SECS {
            warn!(
                requested = self.screenshots.interval_secs,
                clamped = MIN_INTERVAL_SECS,
                "screenshot interval below the minimum; clamping"
            );
            self.screenshots.interval_secs = MIN_INTERVAL_SECS;
        }
        if self.flush_threshold == 0 {
            warn!("flush threshold of 0 is invalid; using 1");
            self.flush_threshold = 1;
        }
        self
    }
}

/// Which capture sources to activate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceToggles {
    pub keyboard: bool,
    pub window_focus: bool,
    pub screenshots: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            keyboard: true,
            window_focus: true,
            screenshots: true,
        }
    }
}

impl SourceToggles {
    /// Parse source toggles from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let entries: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |name: &str| entries.iter().any(|e| e == name || e == "all");

        Self {
            keyboard: has("keyboard"),
            window_focus: has("focus") || entries.iter().any(|e| e == "window-focus"),
            screenshots: has("screenshots") || entries.iter().any(|e| e == "screenshot"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.window_focus || self.screenshots
    }
}

/// Screenshot capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotSettings {
    /// Seconds between interval captures (floor 1).
    pub interval_secs: u32,
    /// Pause capturing after this many seconds without input.
    pub idle_pause_secs: u32,
    /// Minimum seconds between window-change-triggered captures.
    pub change_debounce_secs: u32,
    /// Seconds to wait after a window change before capturing.
    pub capture_delay_secs: u32,
    /// When captures fire.
    pub timing: TimingMode,
    /// How captures are serialized into the log.
    pub output: OutputMode,
    /// Directory for PNG output (created if missing).
    pub output_dir: PathBuf,
}

/// Screenshot timing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingMode {
    FixedInterval,
    WindowChange,
}

impl TimingMode {
    /// Parse a CLI value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed-interval" => Some(TimingMode::FixedInterval),
            "window-change" => Some(TimingMode::WindowChange),
            _ => None,
        }
    }
}

/// Screenshot serialization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    FilePath,
    Base64,
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_toggle_parsing() {
        let toggles = SourceToggles::from_csv("keyboard,focus");
        assert!(toggles.keyboard);
        assert!(toggles.window_focus);
        assert!(!toggles.screenshots);

        let toggles = SourceToggles::from_csv("screenshots");
        assert!(!toggles.keyboard);
        assert!(toggles.screenshots);

        let toggles = SourceToggles::from_csv("all");
        assert!(toggles.keyboard);
        assert!(toggles.window_focus);
        assert!(toggles.screenshots);

        assert!(!SourceToggles::from_csv("none").any_enabled());
    }

    #[test]
    fn default_config_is_sane() {
        let config = RecorderConfig::default();
        assert!(config.sources.any_enabled());
        assert_eq!(config.flush_threshold, DEFAULT_FLUSH_THRESHOLD);
        assert_eq!(config.screenshots.interval_secs, 5);
        assert_eq!(config.screenshots.timing, TimingMode::FixedInterval);
    }

    #[test]
    fn normalization_clamps_invalid_values() {
        let mut config = RecorderConfig::default();
        config.screenshots.interval_secs = 0;
        config.flush_threshold = 0;
        let config = config.normalized();
        assert_eq!(config.screenshots.interval_secs, MIN_INTERVAL_SECS);
        assert_eq!(config.flush_threshold, 1);
    }

    #[test]
    fn timing_mode_parses_cli_values() {
        assert_eq!(
            TimingMode::parse("fixed-interval"),
            Some(TimingMode::FixedInterval)
        );
        assert_eq!(
            TimingMode::parse("window-change"),
            Some(TimingMode::WindowChange)
        );
        assert_eq!(TimingMode::parse("hourly"), None);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RecorderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RecorderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.screenshots.timing, config.screenshots.timing);
        assert_eq!(parsed.log_path, config.log_path);
    }
}
