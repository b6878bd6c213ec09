//! Application configuration management.
//!
//! This module handles the persistent configuration for alf, including the
//! cache and session directories, worker pool size, polling intervals and the
//! names of the external tools that do the actual audio work. Configuration is
//! stored in the user's config directory (typically ~/.config/alf/config.toml)
//! and every key falls back to a sensible default when absent.

use crate::constants::CACHE_SUBDIR;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// External programs invoked by the indexer, renderer and daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tools {
    #[serde(default = "default_decoder")]
    pub decoder: String,
    #[serde(default = "default_beat_tracker")]
    pub beat_tracker: String,
    #[serde(default = "default_pitch_detector")]
    pub pitch_detector: String,
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_browser")]
    pub browser: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Overrides the XDG cache root when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    #[serde(default = "default_index_workers")]
    pub index_workers: usize,
    #[serde(default = "default_index_spark_width")]
    pub index_spark_width: usize,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_ipc_timeout_ms")]
    pub ipc_timeout_ms: u64,
    #[serde(default = "default_list_max_files")]
    pub list_max_files: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub tools: Tools,
}

fn default_decoder() -> String {
    "sox".to_string()
}

fn default_beat_tracker() -> String {
    "aubiotrack".to_string()
}

fn default_pitch_detector() -> String {
    "aubiopitch".to_string()
}

fn default_player() -> String {
    "mpv".to_string()
}

fn default_browser() -> String {
    "lf".to_string()
}

fn default_state_dir() -> String {
    "/tmp/alf".to_string()
}

fn default_index_workers() -> usize {
    4
}

fn default_index_spark_width() -> usize {
    10
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_ipc_timeout_ms() -> u64 {
    500
}

fn default_list_max_files() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            decoder: default_decoder(),
            beat_tracker: default_beat_tracker(),
            pitch_detector: default_pitch_detector(),
            player: default_player(),
            browser: default_browser(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            cache_dir: None,
            state_dir: default_state_dir(),
            index_workers: default_index_workers(),
            index_spark_width: default_index_spark_width(),
            tool_timeout_secs: default_tool_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            ipc_timeout_ms: default_ipc_timeout_ms(),
            list_max_files: default_list_max_files(),
            log_level: default_log_level(),
            tools: Tools::default(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("alf")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("alf")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Directory holding the per-directory cache files.
    ///
    /// Resolution order: `cache_dir` from the config file, `$XDG_CACHE_HOME`,
    /// then the platform cache directory. The `alf` subdirectory is appended
    /// in every case.
    pub fn cache_root(&self) -> Result<PathBuf, Box<dyn Error>> {
        let base = if let Some(dir) = &self.cache_dir {
            PathBuf::from(shellexpand::tilde(dir).as_ref())
        } else if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
            PathBuf::from(xdg_cache)
        } else {
            dirs::cache_dir().ok_or("Unable to find cache directory")?
        };
        Ok(base.join(CACHE_SUBDIR))
    }

    /// Directory holding the ephemeral playback session files
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).as_ref())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_millis(self.ipc_timeout_ms)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "cache_dir" => self.cache_dir = Some(value.to_string()),
            "state_dir" => self.state_dir = value.to_string(),
            "index_workers" => {
                let workers = value
                    .parse::<usize>()
                    .map_err(|_| "Value must be a positive integer")?;
                if workers == 0 {
                    return Err("index_workers must be at least 1".into());
                }
                self.index_workers = workers;
            }
            "index_spark_width" => {
                self.index_spark_width = value
                    .parse::<usize>()
                    .map_err(|_| "Value must be a positive integer")?;
            }
            "tool_timeout_secs" => {
                self.tool_timeout_secs = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a number of seconds")?;
            }
            "poll_interval_ms" => {
                self.poll_interval_ms = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a number of milliseconds")?;
            }
            "ipc_timeout_ms" => {
                self.ipc_timeout_ms = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a number of milliseconds")?;
            }
            "list_max_files" => {
                self.list_max_files = value
                    .parse::<usize>()
                    .map_err(|_| "Value must be a positive integer")?;
            }
            "log_level" => {
                value
                    .parse::<log::LevelFilter>()
                    .map_err(|_| "Value must be one of off, error, warn, info, debug, trace")?;
                self.log_level = value.to_string();
            }
            "player" => self.tools.player = value.to_string(),
            "browser" => self.tools.browser = value.to_string(),
            "decoder" => self.tools.decoder = value.to_string(),
            "beat_tracker" => self.tools.beat_tracker = value.to_string(),
            "pitch_detector" => self.tools.pitch_detector = value.to_string(),
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.state_dir, "/tmp/alf");
        assert_eq!(config.index_workers, 4);
        assert_eq!(config.index_spark_width, 10);
        assert_eq!(config.poll_interval_ms, 300);
        assert_eq!(config.tools.player, "mpv");
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("index_workers = 2\n[tools]\nplayer = \"mpv2\"\n").unwrap();
        assert_eq!(config.index_workers, 2);
        assert_eq!(config.tools.player, "mpv2");
        assert_eq!(config.tools.decoder, "sox");
        assert_eq!(config.poll_interval_ms, 300);
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::new();

        config.set_value("index_workers", "8").unwrap();
        assert_eq!(config.index_workers, 8);

        config.set_value("player", "/usr/local/bin/mpv").unwrap();
        assert_eq!(config.tools.player, "/usr/local/bin/mpv");

        config.set_value("log_level", "debug").unwrap();
        assert_eq!(config.log_level, "debug");

        config.set_value("beat_tracker", "/opt/aubio/aubiotrack").unwrap();
        config.set_value("pitch_detector", "/opt/aubio/aubiopitch").unwrap();
        assert_eq!(config.tools.beat_tracker, "/opt/aubio/aubiotrack");
        assert_eq!(config.tools.pitch_detector, "/opt/aubio/aubiopitch");

        assert!(config.set_value("index_workers", "0").is_err());
        assert!(config.set_value("index_workers", "many").is_err());
        assert!(config.set_value("log_level", "loud").is_err());
        assert!(config.set_value("unknown_key", "value").is_err());
    }

    #[test]
    fn test_cache_root_override() {
        let mut config = Config::new();
        config.cache_dir = Some("/var/cache/custom".to_string());
        assert_eq!(
            config.cache_root().unwrap(),
            PathBuf::from("/var/cache/custom/alf")
        );
    }

    #[test]
    fn test_cache_root_from_xdg() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original = std::env::var("XDG_CACHE_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CACHE_HOME", temp_dir.path());
        }

        let config = Config::new();
        assert_eq!(config.cache_root().unwrap(), temp_dir.path().join("alf"));

        unsafe {
            if let Some(original) = original {
                std::env::set_var("XDG_CACHE_HOME", original);
            } else {
                std::env::remove_var("XDG_CACHE_HOME");
            }
        }
    }

    #[test]
    fn test_config_save_and_load() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        assert!(!Config::exists().unwrap());

        let mut config = Config::new();
        config.index_workers = 6;
        config.save().unwrap();

        let config_path = Config::config_path().unwrap();
        assert!(config_path.starts_with(temp_dir.path().join("alf")));
        assert!(Config::exists().unwrap());

        let loaded = Config::load().unwrap();
        assert_eq!(loaded.index_workers, 6);
        assert_eq!(loaded.tools, Tools::default());

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}
