//! Geocoding with snapshot caching.
//!
//! Location names are resolved to coordinates through an external
//! provider, with a caller-supplied snapshot consulted first so repeated
//! report runs avoid redundant calls against a rate-limited API. "Address
//! not found" is cached permanently as an explicit sentinel; provider
//! errors (network, auth, rate limit, timeout) abort the resolution
//! instead of poisoning the cache.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{GeoResolution, GeoSnapshot};

/// Errors that can occur during geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid geocoder URL: {0}")]
    InvalidUrl(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// External lookup capability: name to coordinate or not-found.
///
/// "Not found" is a successful resolution; anything that prevents the
/// provider from answering surfaces as an error.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<GeoResolution, GeocodeError>;
}

/// Configuration for the Google geocoder.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Provider endpoint
    pub base_url: String,

    /// API key sent with every request
    pub api_key: String,

    /// Request timeout; a timed-out lookup is a provider error, not a
    /// permanent not-found
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

// Google Geocoding API response shape (the parts we read).
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LngLat,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LngLat {
    lng: f64,
    lat: f64,
}

/// Geocoder backed by the Google Geocoding API.
pub struct GoogleGeocoder {
    client: Client,
    config: GeocoderConfig,
}

impl GoogleGeocoder {
    /// Create a new geocoder with the given configuration.
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request_url(&self, name: &str) -> Result<Url, GeocodeError> {
        Url::parse_with_params(
            &self.config.base_url,
            &[("address", name), ("key", &self.config.api_key)],
        )
        .map_err(|e| GeocodeError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn lookup(&self, name: &str) -> Result<GeoResolution, GeocodeError> {
        let url = self.request_url(name)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body: GeocodeResponse = response.json().await?;
        match body.status.as_str() {
            "OK" => {
                let location = body
                    .results
                    .first()
                    .map(|r| r.geometry.location)
                    .ok_or_else(|| {
                        GeocodeError::Provider("OK response with no results".to_string())
                    })?;
                Ok(GeoResolution::Found {
                    longitude: location.lng,
                    latitude: location.lat,
                })
            }
            "ZERO_RESULTS" => Ok(GeoResolution::NotFound),
            other => Err(GeocodeError::Provider(
                body.error_message
                    .unwrap_or_else(|| format!("status {}", other)),
            )),
        }
    }
}

/// Geocoder used when enrichment is switched off (no API key, or
/// explicitly disabled). Cached coordinates still flow into reports;
/// an uncached location surfaces as a provider error instead of being
/// stored as a permanent not-found.
pub struct OfflineGeocoder;

#[async_trait]
impl Geocoder for OfflineGeocoder {
    async fn lookup(&self, _name: &str) -> Result<GeoResolution, GeocodeError> {
        Err(GeocodeError::Provider("geocoding disabled".to_string()))
    }
}

/// Resolve each location through the snapshot, falling back to the
/// external lookup only for names the snapshot has never seen.
///
/// The returned map is the new authoritative snapshot for the caller to
/// persist; entries already in `snapshot` are carried through untouched.
/// Any provider error aborts the whole resolution so a transient failure
/// is never cached as a permanent not-found.
pub async fn resolve(
    locations: &BTreeSet<String>,
    snapshot: &GeoSnapshot,
    geocoder: &dyn Geocoder,
) -> Result<GeoSnapshot, GeocodeError> {
    let mut resolved = snapshot.clone();

    for name in locations {
        if resolved.contains_key(name) {
            debug!("Coordinates for {} served from snapshot", name);
            continue;
        }

        info!("Looking up coordinates for {}", name);
        let resolution = geocoder.lookup(name).await?;
        if resolution == GeoResolution::NotFound {
            warn!("{} has no geocoding match, caching not-found", name);
        }
        resolved.insert(name.clone(), resolution);
    }

    Ok(resolved)
}
