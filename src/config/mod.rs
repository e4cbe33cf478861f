//! Configuration loading and validation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Geocoding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderSettings {
    /// Provider endpoint
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,

    /// API key; falls back to the GOOGLE_MAPS_API_KEY environment
    /// variable when empty
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_seconds: u64,

    /// Disable to skip coordinate enrichment entirely
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_geocoder_url() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_string()
}

fn default_geocoder_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            api_key: String::new(),
            timeout_seconds: default_geocoder_timeout(),
            enabled: true,
        }
    }
}

impl GeocoderSettings {
    /// Configured key, or the conventional environment variable.
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.is_empty() {
            std::env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Ingestion configuration: explicit replacements for what used to live
/// as module-level constants in the spreadsheet scripts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Canonical spellings for friend names seen in raw input
    #[serde(default)]
    pub friend_renames: BTreeMap<String, String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub geocoder: GeocoderSettings,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ingest: IngestSettings,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            geocoder: GeocoderSettings::default(),
            server: ServerConfig::default(),
            ingest: IngestSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geocoder.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Geocoder timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
