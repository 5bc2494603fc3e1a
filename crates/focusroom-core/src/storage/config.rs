//! TOML-based user settings.
//!
//! Stores the timer preferences a host persists between sessions:
//! - Phase durations and the long-break cycle
//! - Auto-start behaviour
//! - Sound and notification preferences
//!
//! Settings are stored at `~/.config/focusroom/config.toml`. The engine
//! never reads this file; hosts convert it with [`Settings::session_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::SessionConfig;

/// Durations in minutes and the long-break cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break_duration: u32,
    #[serde(default = "default_long_break")]
    pub long_break_duration: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

/// Auto-start behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSettings {
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
}

/// Sound and notification preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_50")]
    pub sound_volume: u8,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

/// Persisted settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub behavior: BehaviorSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

// Default functions
fn default_work_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_50() -> u8 {
    50
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            auto_start_breaks: true,
            auto_start_work: false,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_volume: 50,
            notifications_enabled: true,
        }
    }
}

impl Settings {
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
                    serde_json::Value::Bool(_) => {
                        let b = value.parse::<bool>().map_err(|_| {
                            ConfigError::ParseFailed(format!("cannot parse '{value}' as bool"))
                        })?;
                        serde_json::Value::Bool(b)
                    }
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| {
                            ConfigError::ParseFailed(format!(
                                "cannot parse '{value}' as a non-negative integer"
                            ))
                        })?;
                        serde_json::Value::Number(n.into())
                    }
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

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed,
    /// or if the defaults cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.save_to(path)?;
                Ok(settings)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a value as string by dot-separated key, e.g. `timer.work_duration`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result would not be a valid session configuration. `self` is
    /// left untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Settings = serde_json::from_value(json)
            .map_err(|e| ConfigError::ParseFailed(format!("{key}: {e}")))?;
        updated.session_config()?;
        *self = updated;
        Ok(())
    }

    /// All leaf keys with their values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (name, value) in fields {
                        out.push((format!("{section}.{name}"), value.to_string()));
                    }
                }
            }
        }
        out
    }

    /// Validated engine configuration.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        SessionConfig {
            work_duration: self.timer.work_duration,
            short_break_duration: self.timer.short_break_duration,
            long_break_duration: self.timer.long_break_duration,
            sessions_until_long_break: self.timer.sessions_until_long_break,
            auto_start_breaks: self.behavior.auto_start_breaks,
            auto_start_work: self.behavior.auto_start_work,
            sound_enabled: self.notifications.sound_enabled,
            sound_volume: self.notifications.sound_volume,
            notifications_enabled: self.notifications.notifications_enabled,
        }
        .validated()
    }
}
