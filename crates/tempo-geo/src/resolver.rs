//! Cached address/coordinate resolution.
//!
//! Every lookup goes through the cache first. A miss calls the provider,
//! stores the answer under a new key and rewrites the cache file before
//! returning. Failures are returned as-is; callers decide whether to retry.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use tempo_core::Config;

use crate::cache::GeoCache;
use crate::geocode::GeocodingClient;
use crate::types::{GeoError, GeocodeResult};

/// City-like component types, highest priority first.
pub const CITY_TYPES: [&str; 4] = [
    "locality",
    "postal_town",
    "administrative_area_level_3",
    "administrative_area_level_2",
];

const GB_SUFFIX: &str = ", GB";
const GB_REPLACEMENT: &str = " Great Britain";

#[derive(Debug)]
pub struct GeoResolver {
    client: GeocodingClient,
    cache: GeoCache,
}

impl GeoResolver {
    pub fn new(client: GeocodingClient, cache: GeoCache) -> Self {
        Self { client, cache }
    }

    /// Build a resolver from settings, loading the cache file if it is usable.
    pub fn from_config(config: &Config, api_key: &str) -> Result<Self, GeoError> {
        let client = GeocodingClient::with_base_url(
            api_key,
            &config.geocoding.base_url,
            Duration::from_secs(config.geocoding.request_timeout_secs),
        )?;
        let cache = GeoCache::load_or_empty(config.cache_path(), config.geocoding.cache_capacity);
        Ok(Self::new(client, cache))
    }

    pub fn cache(&self) -> &GeoCache {
        &self.cache
    }

    /// Coordinates of the first forward-geocoding match for `address`.
    pub async fn resolve_coordinates(&mut self, address: &str) -> Result<(f64, f64), GeoError> {
        let key = normalize_address(address);
        if let Some(hit) = self.cached::<(f64, f64)>(&key) {
            return Ok(hit);
        }

        let results = self.client.geocode(&key).await?;
        let first = first_result(results, &key)?;
        let location = first
            .geometry
            .ok_or_else(|| GeoError::MalformedResponse(format!("no geometry for {}", key)))?
            .location;

        let coords = (location.lat, location.lng);
        self.remember(key, &coords);
        Ok(coords)
    }

    /// Formatted address of the first reverse-geocoding match.
    pub async fn resolve_address(&mut self, lat: f64, lon: f64) -> Result<String, GeoError> {
        self.formatted_address(coordinate_key("address", lat, lon), lat, lon)
            .await
    }

    /// Same lookup as [`resolve_address`](Self::resolve_address), cached separately.
    pub async fn resolve_location_address(&mut self, lat: f64, lon: f64) -> Result<String, GeoError> {
        self.formatted_address(coordinate_key("location_address", lat, lon), lat, lon)
            .await
    }

    /// City and country names for a coordinate pair.
    pub async fn resolve_city_country(
        &mut self,
        lat: f64,
        lon: f64,
    ) -> Result<(String, String), GeoError> {
        let key = coordinate_key("city_country", lat, lon);
        if let Some(hit) = self.cached::<(String, String)>(&key) {
            return Ok(hit);
        }

        let results = self.client.reverse_geocode(lat, lon).await?;
        tracing::debug!("Reverse geocode result for {}: {:?}", key, results.first());
        let first = first_result(results, &key)?;

        let (city, country) = pick_city_country(&first);
        tracing::debug!("Picked city={:?} country={:?}", city, country);
        let (Some(city), Some(country)) = (city, country) else {
            return Err(GeoError::Resolution(format!(
                "city or country not found in address components for {}",
                key
            )));
        };

        let pair = (city, country);
        self.remember(key, &pair);
        Ok(pair)
    }

    async fn formatted_address(&mut self, key: String, lat: f64, lon: f64) -> Result<String, GeoError> {
        if let Some(hit) = self.cached::<String>(&key) {
            return Ok(hit);
        }

        let results = self.client.reverse_geocode(lat, lon).await?;
        let address = first_result(results, &key)?
            .formatted_address
            .ok_or_else(|| GeoError::MalformedResponse(format!("no formatted address for {}", key)))?;

        self.remember(key, &address);
        Ok(address)
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => {
                tracing::debug!("Geocoding cache hit: {}", key);
                Some(v)
            }
            Err(e) => {
                tracing::warn!("Cached value for {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    fn remember<T: Serialize>(&mut self, key: String, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Could not encode cache entry {}: {}", key, e);
                return;
            }
        };

        if self.cache.insert(key, value) {
            if let Err(e) = self.cache.save() {
                tracing::warn!("Geocoding cache not persisted: {}", e);
            }
        }
    }
}

/// Rewrite a trailing `", GB"` so the provider reads it as a country name.
pub fn normalize_address(address: &str) -> String {
    match address.strip_suffix(GB_SUFFIX) {
        Some(head) => format!("{}{}", head, GB_REPLACEMENT),
        None => address.to_string(),
    }
}

/// Composite cache key such as `address_55.953251,-3.188267`.
///
/// Coordinates are rendered the way the earlier tooling rendered floats:
/// integral values keep a trailing `.0` (`51.0`), and magnitudes below 1e-4
/// or from 1e16 up use a signed two-digit exponent (`5e-05`, `1e+16`).
pub fn coordinate_key(prefix: &str, lat: f64, lon: f64) -> String {
    format!("{}_{},{}", prefix, format_coordinate(lat), format_coordinate(lon))
}

fn format_coordinate(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", value);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => sci,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn first_result(results: Vec<GeocodeResult>, query: &str) -> Result<GeocodeResult, GeoError> {
    results
        .into_iter()
        .next()
        .ok_or_else(|| GeoError::Resolution(format!("provider returned no results for {}", query)))
}

/// City by type priority, country from the last `country` component.
pub fn pick_city_country(result: &GeocodeResult) -> (Option<String>, Option<String>) {
    let components = &result.address_components;

    let city = CITY_TYPES.iter().find_map(|kind| {
        components
            .iter()
            .find(|c| c.has_type(kind))
            .map(|c| c.long_name.clone())
    });

    let country = components
        .iter()
        .rev()
        .find(|c| c.has_type("country"))
        .map(|c| c.long_name.clone());

    (city, country)
}
