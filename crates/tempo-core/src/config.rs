use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no API key is set in the config file.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

const APP_DIR_NAME: &str = "tempo-events";
const CACHE_FILE_NAME: &str = "googlemaps_cache.jsonl";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Spreadsheet export and feed output settings
    #[serde(default)]
    pub sheet: SheetConfig,

    /// Geocoding provider and cache settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Spreadsheet document identifier
    #[serde(default = "default_sheet_id")]
    pub sheet_id: String,

    /// Base URL of the export endpoint (`{base}/spreadsheets/d/{id}/export`)
    #[serde(default = "default_export_base_url")]
    pub export_base_url: String,

    /// Where the JSON feed is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Total fetch attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_sheet_timeout")]
    pub request_timeout_secs: u64,

    /// Lower bound of the per-attempt backoff factor
    #[serde(default = "default_retry_min_delay_ms")]
    pub retry_min_delay_ms: u64,

    /// Upper bound of the per-attempt backoff factor
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_sheet_id() -> String {
    "1DKRL7HTK2DNcyMTo6ItvXDvZIem4Vls6hIvnqHfNY8E".to_string()
}

fn default_export_base_url() -> String {
    "https://docs.google.com".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("events.json")
}

fn default_max_retries() -> u32 {
    3
}

fn default_sheet_timeout() -> u64 {
    30
}

fn default_retry_min_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    3000
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            sheet_id: default_sheet_id(),
            export_base_url: default_export_base_url(),
            output_path: default_output_path(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_sheet_timeout(),
            retry_min_delay_ms: default_retry_min_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Google Maps API key. Falls back to `GOOGLE_MAPS_API_KEY` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Geocoding endpoint
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    #[serde(default = "default_geocoding_timeout")]
    pub request_timeout_secs: u64,

    /// Cache file location; defaults to `{config_dir}/googlemaps_cache.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Number of entries kept when the cache is persisted
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_geocoding_base_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}

fn default_geocoding_timeout() -> u64 {
    10
}

fn default_cache_capacity() -> usize {
    1000
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            request_timeout_secs: default_geocoding_timeout(),
            cache_path: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl GeocodingConfig {
    /// The configured API key, or the one from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            sheet: SheetConfig::default(),
            geocoding: GeocodingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Path of the geocoding cache file
    pub fn cache_path(&self) -> PathBuf {
        self.geocoding
            .cache_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join(CACHE_FILE_NAME))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.sheet.sheet_id.trim().is_empty() {
            result.add_error("sheet.sheet_id", "Sheet id must not be empty");
        }

        self.validate_url(&self.sheet.export_base_url, "sheet.export_base_url", &mut result);
        self.validate_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);

        if self.sheet.request_timeout_secs == 0 {
            result.add_error("sheet.request_timeout_secs", "Timeout must be greater than 0");
        }
        if self.geocoding.request_timeout_secs == 0 {
            result.add_error(
                "geocoding.request_timeout_secs",
                "Timeout must be greater than 0",
            );
        }

        if self.sheet.max_retries == 0 {
            result.add_warning("sheet.max_retries", "Feed fetch disabled (0 attempts)");
        }

        if self.sheet.retry_min_delay_ms > self.sheet.retry_max_delay_ms {
            result.add_error(
                "sheet.retry_min_delay_ms",
                "Minimum retry delay is larger than the maximum",
            );
        }

        if self.geocoding.cache_capacity == 0 {
            result.add_error(
                "geocoding.cache_capacity",
                "Cache capacity must be greater than 0",
            );
        }

        if self.geocoding.resolved_api_key().is_none() {
            result.add_error(
                "geocoding.api_key",
                format!("No API key configured and {} is not set", API_KEY_ENV),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                // Check scheme
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                // Check host
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join(APP_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
