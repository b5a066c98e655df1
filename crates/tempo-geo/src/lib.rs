//! Geocoding for the event feed.
//!
//! Forward and reverse lookups against the Google Geocoding API, memoized in
//! a JSONL cache file, plus a coordinate jitter helper.

pub mod types;
pub mod cache;
pub mod geocode;
pub mod jitter;
pub mod resolver;

pub use types::*;
pub use cache::GeoCache;
pub use geocode::GeocodingClient;
pub use jitter::{jitter_latlon, jitter_latlon_circle};
pub use resolver::{normalize_address, GeoResolver};
