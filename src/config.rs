use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::CATEGORIES;
use crate::store::DEFAULT_STORAGE_KEY;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_countdown_interval_secs")]
    pub countdown_interval_secs: u64,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_toggle")]
    pub toggle: String,
    #[serde(default = "default_search")]
    pub search: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_move_up")]
    pub move_up: String,
    #[serde(default = "default_move_down")]
    pub move_down: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_overdue_fg")]
    pub overdue_fg: String,
    #[serde(default = "default_completed_fg")]
    pub completed_fg: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            storage_key: default_storage_key(),
            countdown_interval_secs: default_countdown_interval_secs(),
            categories: default_categories(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
            key_bindings: KeyBindings::default(),
            theme: Theme::default(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            edit: default_edit(),
            delete: default_delete(),
            toggle: default_toggle(),
            search: default_search(),
            help: default_help(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            move_up: default_move_up(),
            move_down: default_move_down(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            overdue_fg: default_overdue_fg(),
            completed_fg: default_completed_fg(),
        }
    }
}

// Default value functions
fn default_storage_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("todos.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/countdo/todos.db".to_string()
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_countdown_interval_secs() -> u64 {
    60
}

fn default_categories() -> Vec<String> {
    CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_toggle() -> String {
    "Space".to_string()
}

fn default_search() -> String {
    "/".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_move_up() -> String {
    "K".to_string()
}

fn default_move_down() -> String {
    "J".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_overdue_fg() -> String {
    "lightred".to_string()
}

fn default_completed_fg() -> String {
    "darkgray".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and storage paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        let mut config = Self::load_from_path(&config_path)?;

        // Ensure storage path matches profile (in case config was manually edited)
        config.storage_path = Self::default_storage_path_for_profile(profile);
        Ok(config)
    }

    /// Load configuration from an explicit file, creating it with defaults if missing.
    /// The storage path in the file is honored as written.
    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let mut config = Config::default();
            if let Err(e) = config.save_to_path(config_path) {
                tracing::error!(error = %e, path = %config_path.display(), "failed to save config file");
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to the profile's config file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to file
    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue("storage_key must not be empty".to_string()));
        }
        if self.countdown_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "countdown_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default storage path for a specific profile
    fn default_storage_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("todos.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/countdo-dev/todos.db".to_string(),
                utils::Profile::Prod => "~/.local/share/countdo/todos.db".to_string(),
            }
        }
    }

    /// Get the expanded storage path (with ~ expansion)
    pub fn get_storage_path(&self) -> PathBuf {
        utils::expand_path(&self.storage_path)
    }

    /// Log file sits next to the storage file
    pub fn get_log_path(&self) -> PathBuf {
        let storage_path = self.get_storage_path();
        match storage_path.parent() {
            Some(dir) => dir.join("countdo.log"),
            None => PathBuf::from("countdo.log"),
        }
    }

    pub fn countdown_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.countdown_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let config = Config::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.storage_key, "todos");
        assert_eq!(config.countdown_interval_secs, 60);
        assert_eq!(config.categories.len(), CATEGORIES.len());
        assert_eq!(config.key_bindings.toggle, "Space");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "storage_key = \"mine\"\ncategories = [\"Garden\"]\n\n[key_bindings]\nquit = \"x\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.storage_key, "mine");
        assert_eq!(config.categories, ["Garden"]);
        assert_eq!(config.key_bindings.quit, "x");
        assert_eq!(config.key_bindings.new, "n");
        assert_eq!(config.theme.overdue_fg, "lightred");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "countdown_interval_secs = 0\n").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "storage_key = [").unwrap();
        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.countdown_interval_secs = 30;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.countdown_interval(), std::time::Duration::from_secs(30));
        assert_eq!(loaded.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn log_file_is_beside_storage() {
        let config = Config {
            storage_path: "/tmp/countdo/todos.db".to_string(),
            ..Config::default()
        };
        assert_eq!(config.get_log_path(), PathBuf::from("/tmp/countdo/countdo.log"));
    }
}
