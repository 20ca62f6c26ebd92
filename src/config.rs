//! Configuration management for uploadgram
//!
//! Settings come from an optional JSON file, then environment variables
//! (`UG_TG_*`) override whatever the file said.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default flood-wait threshold below which grammers sleeps transparently
pub const DEFAULT_FLOOD_SLEEP_THRESHOLD: u32 = 60;

/// Default worker count
pub const DEFAULT_WORKERS: usize = 24;

/// Default number of concurrent transmissions
pub const DEFAULT_MAX_CONCURRENT_TRANSMISSIONS: usize = 10;

/// Delay between two files of a batch
pub const DEFAULT_PACING_DELAY_MS: u64 = 1000;

/// Minimum interval between two edits of the same status message
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 5000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram API configuration
    pub telegram: TelegramConfig,

    /// Upload behaviour
    pub upload: UploadConfig,
}

/// Telegram API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Telegram API ID (get from my.telegram.org)
    pub api_id: i32,

    /// Telegram API hash
    pub api_hash: String,

    /// Session file path
    pub session_file: PathBuf,

    /// Flood waits up to this many seconds are slept through by the client
    pub flood_sleep_threshold: u32,

    /// Worker count
    pub workers: usize,

    /// Maximum concurrent transmissions
    pub max_concurrent_transmissions: usize,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Uppercase extensions sent as video
    pub video_extensions: Vec<String>,

    /// Uppercase extensions sent as audio
    pub audio_extensions: Vec<String>,

    /// Pause between files (ms)
    pub pacing_delay_ms: u64,

    /// Throttle window for status message edits (ms)
    pub progress_interval_ms: u64,

    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable
    pub ffprobe_path: PathBuf,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        let session_file = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("uploadgram")
            .join("uploadgram.session");

        TelegramConfig {
            api_id: 0,
            api_hash: String::new(),
            session_file,
            flood_sleep_threshold: DEFAULT_FLOOD_SLEEP_THRESHOLD,
            workers: DEFAULT_WORKERS,
            max_concurrent_transmissions: DEFAULT_MAX_CONCURRENT_TRANSMISSIONS,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            video_extensions: ["MKV", "MP4", "WEBM"].map(String::from).to_vec(),
            audio_extensions: ["MP3", "M4A", "M4B", "FLAC", "WAV"].map(String::from).to_vec(),
            pacing_delay_ms: DEFAULT_PACING_DELAY_MS,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl UploadConfig {
    pub fn is_video_extension(&self, ext: &str) -> bool {
        self.video_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_audio_extension(&self, ext: &str) -> bool {
        self.audio_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Config {
    /// Load configuration from a file, with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("Failed to read config file: {}", e))
        })?;

        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise build from the environment alone
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::from_env()
        }
    }

    /// Create a new config from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();

        if config.telegram.api_id == 0 {
            return Err(Error::InvalidConfig(
                "UG_TG_APP_ID environment variable is required".to_string(),
            ));
        }
        if config.telegram.api_hash.is_empty() {
            return Err(Error::InvalidConfig(
                "UG_TG_API_HASH environment variable is required".to_string(),
            ));
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = var("UG_TG_APP_ID").and_then(|v| v.trim().parse::<i32>().ok()) {
            self.telegram.api_id = id;
        }

        if let Some(hash) = var("UG_TG_API_HASH") {
            let hash = hash.trim().to_string();
            if !hash.is_empty() {
                self.telegram.api_hash = hash;
            }
        }

        if let Some(st) = var("UG_TG_ST").and_then(|v| v.trim().parse::<u32>().ok()) {
            self.telegram.flood_sleep_threshold = st;
        }

        if let Some(ws) = var("UG_TG_WS").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.telegram.workers = ws;
        }

        if let Some(mcts) = var("UG_TG_MCTS").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.telegram.max_concurrent_transmissions = mcts;
        }

        if let Some(session) = var("UG_TG_SESSION") {
            let session = session.trim();
            if !session.is_empty() {
                self.telegram.session_file = PathBuf::from(session);
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.telegram.api_id == 0 {
            return Err(Error::InvalidConfig(
                "Telegram API ID is required".to_string(),
            ));
        }

        if self.telegram.api_hash.is_empty() {
            return Err(Error::InvalidConfig(
                "Telegram API hash is required".to_string(),
            ));
        }

        if self.telegram.workers == 0 || self.telegram.max_concurrent_transmissions == 0 {
            return Err(Error::InvalidConfig(
                "Worker and transmission counts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Ensure the session directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.telegram.session_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("UG_TG_APP_ID", " 12345 "),
            ("UG_TG_API_HASH", "abcdef"),
            ("UG_TG_ST", "30"),
            ("UG_TG_WS", "8"),
            ("UG_TG_MCTS", "not-a-number"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).cloned());

        assert_eq!(config.telegram.api_id, 12345);
        assert_eq!(config.telegram.api_hash, "abcdef");
        assert_eq!(config.telegram.flood_sleep_threshold, 30);
        assert_eq!(config.telegram.workers, 8);
        assert_eq!(
            config.telegram.max_concurrent_transmissions,
            DEFAULT_MAX_CONCURRENT_TRANSMISSIONS
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_extension_sets() {
        let upload = UploadConfig::default();
        assert!(upload.is_video_extension("MKV"));
        assert!(upload.is_video_extension("mp4"));
        assert!(upload.is_audio_extension("FLAC"));
        assert!(!upload.is_video_extension("MP3"));
        assert!(!upload.is_audio_extension(""));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"telegram": {"api_id": 1, "api_hash": "h"}, "upload": {"pacing_delay_ms": 0}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.upload.pacing_delay(), Duration::ZERO);
        assert_eq!(config.upload.progress_interval(), Duration::from_secs(5));
        assert_eq!(config.telegram.workers, DEFAULT_WORKERS);
    }
}
