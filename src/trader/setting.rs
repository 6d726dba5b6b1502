//! Global settings of the live candle series.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use super::constant::{Periodicity, DEFAULT_BAR_COUNT, DEFAULT_INTERVAL_MULTIPLIER, MAX_BAR_COUNT};
use super::error::SeriesError;
use super::gateway::TokenProvider;
use super::period::parse_timezone;
use super::utility::get_file_path;

/// Setting filename
const SETTING_FILENAME: &str = "candle_setting.json";

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Log settings
    settings.insert("log.active".to_string(), SettingValue::Bool(true));
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));

    // Chart settings
    settings.insert("chart.bar_count".to_string(), SettingValue::Int(DEFAULT_BAR_COUNT as i64));
    settings.insert("chart.interval".to_string(), SettingValue::Int(DEFAULT_INTERVAL_MULTIPLIER as i64));
    settings.insert("chart.periodicity".to_string(), SettingValue::String("minute".to_string()));
    settings.insert("chart.timezone".to_string(), SettingValue::String("UTC".to_string()));

    // Fintacharts settings
    settings.insert(
        "fintacharts.rest_host".to_string(),
        SettingValue::String("https://platform.fintacharts.com".to_string()),
    );
    settings.insert(
        "fintacharts.ws_url".to_string(),
        SettingValue::String("wss://platform.fintacharts.com/api/streaming/ws/v1/realtime".to_string()),
    );
    settings.insert("fintacharts.provider".to_string(), SettingValue::String("oanda".to_string()));
    settings.insert("fintacharts.access_token".to_string(), SettingValue::String(String::new()));

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create new Settings with defaults overlaid by the setting file
    pub fn new() -> Self {
        let settings = Self::with_defaults();
        if let Some(file_settings) = load_settings_from_file(&get_file_path(SETTING_FILENAME)) {
            settings.update(file_settings);
        }
        settings
    }

    /// Create new Settings holding only the defaults
    pub fn with_defaults() -> Self {
        Self {
            settings: RwLock::new(default_settings()),
        }
    }

    /// Create new Settings with defaults overlaid by the given JSON file
    pub fn from_path(path: &Path) -> Self {
        let settings = Self::with_defaults();
        if let Some(file_settings) = load_settings_from_file(path) {
            settings.update(file_settings);
        }
        settings
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Update settings from a map
    pub fn update(&self, new_settings: HashMap<String, SettingValue>) {
        if let Ok(mut settings) = self.settings.write() {
            for (key, value) in new_settings {
                settings.insert(key, value);
            }
        }
    }

    /// Save settings to the given file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.settings.read().map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Save settings to the data directory
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&get_file_path(SETTING_FILENAME))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenProvider for Settings {
    fn access_token(&self) -> Option<String> {
        self.get_string("fintacharts.access_token")
            .filter(|token| !token.trim().is_empty())
    }
}

/// Load settings from JSON file
fn load_settings_from_file(filepath: &Path) -> Option<HashMap<String, SettingValue>> {
    if filepath.exists() {
        let content = fs::read_to_string(filepath).ok()?;
        serde_json::from_str(&content).ok()
    } else {
        None
    }
}

/// Typed configuration of a live series controller
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSettings {
    /// Bars kept in the window (N)
    pub bar_count: usize,
    /// Interval multiplier sent with history requests
    pub interval: u32,
    /// Periodicity used when none is chosen explicitly
    pub periodicity: Periodicity,
    /// Reference zone for bar boundaries, fixed for the controller's lifetime
    pub timezone: Tz,
}

impl SeriesSettings {
    /// Extract the series configuration.
    ///
    /// Bar count must lie in `1..=MAX_BAR_COUNT` and the interval in `1..=u32::MAX`.
    pub fn from_settings(settings: &Settings) -> Result<Self, SeriesError> {
        let defaults = Self::default();

        let bar_count = match settings.get_int("chart.bar_count") {
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| (1..=MAX_BAR_COUNT).contains(n))
                .ok_or_else(|| invalid_setting("chart.bar_count", n))?,
            None => defaults.bar_count,
        };
        let interval = match settings.get_int("chart.interval") {
            Some(n) => u32::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid_setting("chart.interval", n))?,
            None => defaults.interval,
        };
        let periodicity = match settings.get_string("chart.periodicity") {
            Some(value) => value.parse()?,
            None => defaults.periodicity,
        };
        let timezone = match settings.get_string("chart.timezone") {
            Some(value) => parse_timezone(&value)?,
            None => defaults.timezone,
        };

        Ok(Self {
            bar_count,
            interval,
            periodicity,
            timezone,
        })
    }
}

fn invalid_setting(key: &str, value: i64) -> SeriesError {
    SeriesError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            bar_count: DEFAULT_BAR_COUNT,
            interval: DEFAULT_INTERVAL_MULTIPLIER,
            periodicity: Periodicity::Minute,
            timezone: Tz::UTC,
        }
    }
}
