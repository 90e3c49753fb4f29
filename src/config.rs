//! Configuration management for the `clima` dashboard
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::ClimaError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Value shipped in the example config; treated as "no key".
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Shorter keys are reported by [`ClimaConfig::api_key_issues`]
const MIN_API_KEY_LEN: usize = 20;

/// Root configuration structure for the `clima` dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClimaConfig {
    /// Weather API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Response cache and local storage configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Geolocation configuration
    #[serde(default)]
    pub location: LocationConfig,
    /// Refresh, theme and effects settings
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Unit system requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    /// Factor turning the API wind speed into km/h.
    #[must_use]
    pub fn wind_to_kmh(&self) -> f64 {
        match self {
            Units::Imperial => 1.609_344,
            Units::Metric | Units::Standard => 3.6,
        }
    }

    #[must_use]
    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// Base URL for weather API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Unit system
    #[serde(default)]
    pub units: Units,
    /// Language for condition descriptions
    #[serde(default = "default_api_lang")]
    pub lang: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_api_max_retries")]
    pub max_retries: u32,
    /// Base delay before the first retry, doubled on each attempt
    #[serde(default = "default_api_retry_delay")]
    pub retry_delay_ms: u64,
    /// Minimum spacing between two outgoing requests
    #[serde(default = "default_api_min_request_interval")]
    pub min_request_interval_ms: u64,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long fetched data stays valid
    #[serde(default = "default_cache_duration")]
    pub duration_seconds: u64,
    /// Directory of the persistent key-value store
    pub storage_path: Option<PathBuf>,
}

/// Where positions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// Fixed coordinates when configured, IP lookup otherwise
    #[default]
    Auto,
    Fixed,
    Ip,
    /// Never locate; always falls back to the default city
    None,
}

/// Geolocation configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// City used when the position cannot be obtained
    #[serde(default = "default_city")]
    pub default_city: String,
    /// Fixed latitude
    pub latitude: Option<f64>,
    /// Fixed longitude
    pub longitude: Option<f64>,
    #[serde(default)]
    pub provider: LocationProvider,
    /// IP geolocation endpoint
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
    /// Give up locating after this many seconds
    #[serde(default = "default_location_timeout")]
    pub timeout_seconds: u64,
    /// Reuse a previous position younger than this
    #[serde(default = "default_location_maximum_age")]
    pub maximum_age_seconds: u64,
    /// Movement (in degrees) that counts as a new location
    #[serde(default = "default_change_threshold")]
    pub change_threshold_degrees: f64,
}

/// Dashboard behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Automatic refresh period
    #[serde(default = "default_update_interval")]
    pub update_interval_seconds: u64,
    /// How often the day/night theme is re-evaluated
    #[serde(default = "default_theme_check")]
    pub theme_check_seconds: u64,
    /// Number of days shown in the forecast
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,
    /// Whether particle effects are animated in watch mode
    #[serde(default = "default_effects")]
    pub effects: bool,
    /// Animation timestep
    #[serde(default = "default_frame_millis")]
    pub frame_millis: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_api_lang() -> String {
    "es".to_string()
}

fn default_api_timeout() -> u32 {
    10
}

fn default_api_max_retries() -> u32 {
    3
}

fn default_api_retry_delay() -> u64 {
    2000
}

fn default_api_min_request_interval() -> u64 {
    1000
}

fn default_cache_duration() -> u64 {
    10 * 60
}

fn default_city() -> String {
    "Madrid".to_string()
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_location_timeout() -> u64 {
    15
}

fn default_location_maximum_age() -> u64 {
    5 * 60
}

fn default_change_threshold() -> f64 {
    0.01
}

fn default_update_interval() -> u64 {
    10 * 60
}

fn default_theme_check() -> u64 {
    60
}

fn default_forecast_days() -> usize {
    7
}

fn default_effects() -> bool {
    true
}

fn default_frame_millis() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_api_base_url(),
            units: Units::default(),
            lang: default_api_lang(),
            timeout_seconds: default_api_timeout(),
            max_retries: default_api_max_retries(),
            retry_delay_ms: default_api_retry_delay(),
            min_request_interval_ms: default_api_min_request_interval(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_cache_duration(),
            storage_path: None,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
            latitude: None,
            longitude: None,
            provider: LocationProvider::default(),
            ip_lookup_url: default_ip_lookup_url(),
            timeout_seconds: default_location_timeout(),
            maximum_age_seconds: default_location_maximum_age(),
            change_threshold_degrees: default_change_threshold(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            update_interval_seconds: default_update_interval(),
            theme_check_seconds: default_theme_check(),
            forecast_days: default_forecast_days(),
            effects: default_effects(),
            frame_millis: default_frame_millis(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ClimaConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // CLIMA_API__API_KEY, CLIMA_LOCATION__DEFAULT_CITY, ...
        builder = builder.add_source(
            Environment::with_prefix("CLIMA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: ClimaConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clima").join("config.toml"))
    }

    /// Directory of the persistent store, falling back to the user cache dir
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.cache.storage_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("clima")
                .join("storage")
        })
    }

    #[must_use]
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache.duration_seconds)
    }

    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.update_interval_seconds)
    }

    /// The configured key, unless it is missing, blank or the placeholder
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != API_KEY_PLACEHOLDER)
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Problems with the API key worth warning about. Empty when fine.
    #[must_use]
    pub fn api_key_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        match self.api_key() {
            None => issues.push("API key not configured".to_string()),
            Some(key) if key.len() < MIN_API_KEY_LEN => {
                issues.push(format!(
                    "API key looks invalid (too short: {} < {MIN_API_KEY_LEN} chars)",
                    key.len()
                ));
            }
            Some(_) => {}
        }
        issues
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
            return Err(ClimaError::config(
                "Weather API timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.api.max_retries > 10 {
            return Err(ClimaError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.cache.duration_seconds == 0 || self.cache.duration_seconds > 7 * 24 * 60 * 60 {
            return Err(ClimaError::config(
                "Cache duration must be between 1 second and 1 week",
            )
            .into());
        }

        if self.dashboard.update_interval_seconds < 60 {
            return Err(ClimaError::config("Update interval cannot be below 60 seconds").into());
        }

        if !(1..=7).contains(&self.dashboard.forecast_days) {
            return Err(ClimaError::config("Forecast days must be between 1 and 7").into());
        }

        if self.dashboard.frame_millis == 0 {
            return Err(ClimaError::config("Frame interval cannot be zero").into());
        }

        if let (Some(lat), Some(lon)) = (self.location.latitude, self.location.longitude) {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ClimaError::config(format!(
                    "Fixed position out of range: {lat}, {lon}"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ClimaError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ClimaError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ClimaError::config(
                "Weather API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.location.default_city.trim().is_empty() {
            return Err(ClimaError::config("Default city cannot be empty").into());
        }

        Ok(())
    }
}
