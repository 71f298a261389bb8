//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session length and rest-reminder timing
//! - Storage backend behaviour (open timeout, memory-only mode)
//! - The default tag set shown before any tag is saved
//! - Notification preferences
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::TimerConfig;

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound for opening the SQLite database before falling back to memory.
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    /// Skip SQLite entirely and keep everything in memory.
    #[serde(default)]
    pub force_memory: bool,
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

/// Tag configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    /// Returned by `Store::tags` while no tag list has been saved.
    #[serde(default = "default_tags")]
    pub defaults: Vec<String>,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Initial value of the `soundEnabled` setting.
    #[serde(default = "default_true")]
    pub sound: bool,
    /// Ring the terminal bell with each cue.
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_open_timeout_ms() -> u64 {
    1000
}
fn default_db_file() -> String {
    "studytimer.db".into()
}
fn default_tags() -> Vec<String> {
    ["Java", "Operating Systems", "Data Structures", "Algorithms"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            open_timeout_ms: default_open_timeout_ms(),
            force_memory: false,
            db_file: default_db_file(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            defaults: default_tags(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sound: true,
            bell: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject settings the timer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timer;
        if t.total_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.total_minutes".into(),
                message: "must be greater than zero".into(),
            });
        }
        if t.rest_min_minutes == 0 || t.rest_min_minutes > t.rest_max_minutes {
            return Err(ConfigError::InvalidValue {
                key: "timer.rest_min_minutes".into(),
                message: format!(
                    "must be between 1 and rest_max_minutes ({})",
                    t.rest_max_minutes
                ),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// the result fails validation, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Set a config value in memory only.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default configuration: {e}");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.total_minutes, 90);
        assert_eq!(parsed.storage.open_timeout_ms, 1000);
        assert_eq!(parsed.tags.defaults.len(), 4);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\ntotal_minutes = 45\n").unwrap();
        assert_eq!(parsed.timer.total_minutes, 45);
        assert_eq!(parsed.timer.rest_secs, 10);
        assert!(parsed.notifications.sound);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.total_minutes").as_deref(), Some("90"));
        assert_eq!(cfg.get("storage.force_memory").as_deref(), Some("false"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("timer.rest_max_minutes", "8").unwrap();
        assert_eq!(cfg.timer.rest_max_minutes, 8);
    }

    #[test]
    fn apply_splits_list_values() {
        let mut cfg = Config::default();
        cfg.apply("tags.defaults", "Rust, Math").unwrap();
        assert_eq!(cfg.tags.defaults, vec!["Rust", "Math"]);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("timer.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("storage.force_memory", "not_a_bool").is_err());
    }

    #[test]
    fn apply_rejects_inverted_rest_window() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.rest_min_minutes", "9").is_err());
        assert_eq!(cfg.timer.rest_min_minutes, 3);
    }
}
