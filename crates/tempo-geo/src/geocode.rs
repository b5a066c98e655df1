//! Forward and reverse geocoding against the Google Geocoding API.

use reqwest::Client;
use std::time::Duration;

use crate::types::{GeoError, GeocodeResponse, GeocodeResult};

pub const GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "tempo-events/0.1.0";

/// Thin client over the geocoding endpoint. No caching, no retries.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(api_key: &str) -> Result<Self, GeoError> {
        Self::with_base_url(
            api_key,
            GEOCODING_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Point the client at another endpoint (a proxy or a mock server).
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }

    /// Forward geocode an address. An empty list means the provider found nothing.
    pub async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, GeoError> {
        tracing::info!("Geocoding address: {}", address);
        self.lookup(&[("address", address.to_string())]).await
    }

    /// Reverse geocode a coordinate pair.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Vec<GeocodeResult>, GeoError> {
        tracing::info!("Reverse geocoding: {},{}", lat, lon);
        self.lookup(&[("latlng", format!("{},{}", lat, lon))]).await
    }

    async fn lookup(&self, query: &[(&str, String)]) -> Result<Vec<GeocodeResult>, GeoError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeoError::Api {
                status: status.to_string(),
                message: text,
            });
        }

        let text = response.text().await?;
        let body: GeocodeResponse = serde_json::from_str(&text)
            .map_err(|e| GeoError::MalformedResponse(e.to_string()))?;

        match body.status.as_str() {
            "OK" => Ok(body.results),
            "ZERO_RESULTS" => Ok(Vec::new()),
            _ => Err(GeoError::Api {
                status: body.status,
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }
}
