//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for playback settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// A `max_seek_delta` at or below this value keeps the processing-limit bypass off.
pub const MIN_SEEK_DELTA_THRESHOLD: u32 = 100;

/// Name of the configuration file inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Replay tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Playback settings
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Quick-load heuristic settings
    #[serde(default)]
    pub quick_load: QuickLoadConfig,
}

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Loading speed ceiling: the host's per-frame processing limit is
    /// bypassed while its seek delta is below this (default: 100, which keeps
    /// the bypass off)
    #[serde(default = "default_max_seek_delta")]
    pub max_seek_delta: u32,
    /// File loaded most recently, used to resume after a restart
    #[serde(default)]
    pub last_loaded_replay: Option<PathBuf>,
}

/// Quick-load configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickLoadConfig {
    /// Whether chapter jumps use burst seeking (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Max chapters between a cutscene and the end of its burst (default: 2)
    #[serde(default = "default_countdown_clamp")]
    pub countdown_clamp: usize,
    /// Lead-in replayed before the target's start chapter (default: 15000)
    #[serde(default = "default_lead_in_ms")]
    pub lead_in_ms: u32,
}

fn default_true() -> bool {
    true
}
fn default_max_seek_delta() -> u32 {
    MIN_SEEK_DELTA_THRESHOLD
}
fn default_countdown_clamp() -> usize {
    2
}
fn default_lead_in_ms() -> u32 {
    15_000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_seek_delta: default_max_seek_delta(),
            last_loaded_replay: None,
        }
    }
}

impl Default for QuickLoadConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            countdown_clamp: default_countdown_clamp(),
            lead_in_ms: default_lead_in_ms(),
        }
    }
}

impl PlaybackConfig {
    /// Whether the processing-limit bypass should be armed for `seek_delta`.
    pub fn bypass_processing_limit(&self, seek_delta: u32) -> bool {
        self.max_seek_delta > MIN_SEEK_DELTA_THRESHOLD && seek_delta < self.max_seek_delta
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\dutyrec\config`
/// On macOS: `~/Library/Application Support/dev.dutyrec.dutyrec`
/// On Linux: `~/.config/dutyrec`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "dutyrec", "dutyrec")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_dir()
        .map(|dir| load_from(&dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_default()
}

/// Loads the configuration from an explicit path, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| {
            toml::from_str(&content)
                .inspect_err(|e| tracing::warn!("Ignoring invalid config {}: {e}", path.display()))
                .ok()
        })
        .unwrap_or_default()
}

/// Saves the configuration to disk.
///
/// Writes `config.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &Config) -> io::Result<()> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join(CONFIG_FILE_NAME)),
        None => Ok(()),
    }
}

/// Saves the configuration to an explicit path.
pub fn save_to(config: &Config, path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config).map_err(io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.playback.max_seek_delta, 100);
        assert!(config.playback.last_loaded_replay.is_none());
        assert!(config.quick_load.enabled);
        assert_eq!(config.quick_load.countdown_clamp, 2);
        assert_eq!(config.quick_load.lead_in_ms, 15_000);
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
[playback]
max_seek_delta = 400

[quick_load]
lead_in_ms = 5000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.playback.max_seek_delta, 400);
        assert!(config.quick_load.enabled); // default
        assert_eq!(config.quick_load.lead_in_ms, 5_000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.playback.last_loaded_replay = Some(PathBuf::from("/replays/slot2.dat"));
        config.quick_load.enabled = false;
        save_to(&config, &path).unwrap();

        assert_eq!(load_from(&path), config);
    }

    #[test]
    fn test_load_invalid_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "playback = 3").unwrap();
        assert_eq!(load_from(&path), Config::default());
        assert_eq!(load_from(&dir.path().join("missing.toml")), Config::default());
    }

    // =============================================================
    // Bypass threshold tests
    // =============================================================

    #[test]
    fn test_bypass_requires_threshold_above_minimum() {
        let mut playback = PlaybackConfig::default();
        assert!(!playback.bypass_processing_limit(10_000));

        assert!(!playback.bypass_processing_limit(0));

        playback.max_seek_delta = 300;
        assert!(playback.bypass_processing_limit(0));
        assert!(playback.bypass_processing_limit(299));
        assert!(!playback.bypass_processing_limit(300));
        assert!(!playback.bypass_processing_limit(10_000));

        playback.max_seek_delta = 500;
        assert!(playback.bypass_processing_limit(300));
        assert!(!playback.bypass_processing_limit(600));
    }
}
