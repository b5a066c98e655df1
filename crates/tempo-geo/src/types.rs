use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Geocoding API envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A single forward or reverse geocoding match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// The provider answered but had nothing usable for the query.
    #[error("No geocoding result: {0}")]
    Resolution(String),
    #[error("Geocoding API error ({status}): {message}")]
    Api { status: String, message: String },
    #[error("Malformed geocoding response: {0}")]
    MalformedResponse(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Cache file errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to read cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed cache line {line} in {path}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}
