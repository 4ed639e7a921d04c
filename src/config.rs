use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::{Coordinate, Criteria, SortKey, SortOrder, DEFAULT_MAX_DISTANCE_KM};
use crate::session::SessionOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_source: DataSourceSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceSettings {
    pub base_url: String,
    #[serde(default = "default_services_path")]
    pub services_path: String,
    pub timeout_secs: Option<u64>,
}

impl DataSourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

fn default_services_path() -> String { "/services".to_string() }

/// Quiescence window and the criteria a session starts from
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: Option<f64>,
    #[serde(default = "default_open_only")]
    pub open_only: bool,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_distance_km: default_max_distance_km(),
            open_only: default_open_only(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl SearchSettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            quiescence: Duration::from_millis(self.debounce_ms),
            initial_criteria: Criteria {
                max_distance_km: self.max_distance_km,
                open_only: self.open_only,
                sort_by: self.sort_by,
                sort_order: self.sort_order,
                ..Criteria::default()
            },
        }
    }
}

fn default_debounce_ms() -> u64 { 300 }
fn default_max_distance_km() -> Option<f64> { Some(DEFAULT_MAX_DISTANCE_KM) }
fn default_open_only() -> bool { true }

/// Fixed user position, used when no device location is available
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationSettings {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationSettings {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with NETWORKK_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., NETWORKK__DATA_SOURCE__BASE_URL -> data_source.base_url
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("NETWORKK")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
