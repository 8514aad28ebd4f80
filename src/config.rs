//! Configuration module for the directory monitor.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DIRWATCH_` and use double
//! underscores to separate nested levels:
//! - `DIRWATCH_WATCH__DIR=/run/devices` sets `watch.dir`
//! - `DIRWATCH_WATCH__PATTERN=dev\d+` sets `watch.pattern`
//! - `DIRWATCH_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! `watch.dir` and `watch.pattern` are read verbatim, so `[tv]` stays a regex.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding the settings file, relative to the workspace root.
pub const CONFIG_DIR: &str = ".dirwatch";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DIRWATCH_";
/// Keys whose env values are taken as plain text.
const VERBATIM_ENV_KEYS: [&str; 2] = ["watch.dir", "watch.pattern"];

/// `WATCH__PATTERN` -> `watch.pattern`
fn env_key(key: &str) -> String {
    key.to_lowercase().replace("__", ".")
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// Watch directory and pattern
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Directory to watch (not recursive)
    #[serde(default = "default_watch_dir")]
    pub dir: PathBuf,

    /// Regex matched against the start of each filename
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Events buffered between the watcher thread and the monitor loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `dirwatch = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_watch_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_pattern() -> String {
    ".*".to_string()
}
fn default_channel_capacity() -> usize {
    100
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: default_watch_dir(),
            pattern: default_pattern(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still applying env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let mut figment = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .filter(|key| !VERBATIM_ENV_KEYS.contains(&env_key(key.as_str()).as_str()))
                    .map(|key| env_key(key.as_str()).into()),
            );

        // Env values are parsed as TOML-like literals, which would turn
        // patterns such as `[tv]` or `1` into arrays and numbers
        for key in VERBATIM_ENV_KEYS {
            let var = format!("{ENV_PREFIX}{}", key.to_uppercase().replace('.', "__"));
            if let Ok(value) = std::env::var(&var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        figment.extract().map_err(Box::new)
    }

    /// Find the settings file by looking for a `.dirwatch` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `root`
    pub fn init_config_file(
        root: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.watch.dir, PathBuf::from("."));
        assert_eq!(settings.watch.pattern, ".*");
        assert_eq!(settings.watch.channel_capacity, 100);
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[watch]
dir = "/run/vpp"
pattern = 'tap\d+'
channel_capacity = 8

[logging]
default = "info"

[logging.modules]
dirwatch = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.watch.dir, PathBuf::from("/run/vpp"));
        assert_eq!(settings.watch.pattern, r"tap\d+");
        assert_eq!(settings.watch.channel_capacity, 8);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["dirwatch"], "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[watch]\npattern = \"dev\"\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified value
        assert_eq!(settings.watch.pattern, "dev");
        // Defaults still present
        assert_eq!(settings.watch.dir, PathBuf::from("."));
        assert_eq!(settings.watch.channel_capacity, 100);
        assert_eq!(settings.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.watch, WatchConfig::default());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.pattern = "vhost".to_string();
        settings.watch.channel_capacity = 42;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.pattern, "vhost");
        assert_eq!(loaded.watch.channel_capacity, 42);
    }

    #[test]
    fn test_init_config_file_respects_force() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".dirwatch/settings.toml"));
        assert!(path.exists());

        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }
}
