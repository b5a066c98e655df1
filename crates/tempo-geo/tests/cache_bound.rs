//! Persisted cache size after many distinct lookups, using wiremock as the
//! geocoding provider.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tempo_geo::cache::DEFAULT_CAPACITY;
use tempo_geo::{GeoCache, GeoResolver, GeocodingClient};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_persisted_store_keeps_last_thousand_entries() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("googlemaps_cache.jsonl");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 1.5, "lng": 2.5}}}]
        })))
        .mount(&mock_server)
        .await;

    let client =
        GeocodingClient::with_base_url("test-key", &mock_server.uri(), Duration::from_secs(5))
            .unwrap();
    let mut resolver = GeoResolver::new(client, GeoCache::new(&path, DEFAULT_CAPACITY));

    let total = DEFAULT_CAPACITY + 5;
    for i in 0..total {
        resolver
            .resolve_coordinates(&format!("Town {i}, Country"))
            .await
            .unwrap();
    }

    // In memory nothing is pruned
    assert_eq!(resolver.cache().len(), total);

    let persisted = GeoCache::load(&path, DEFAULT_CAPACITY).unwrap();
    assert_eq!(persisted.len(), DEFAULT_CAPACITY);

    let keys: Vec<&str> = persisted.keys().collect();
    assert_eq!(keys.first().copied(), Some("Town 5, Country"));
    assert_eq!(keys.last().copied(), Some("Town 1004, Country"));
    assert!(!persisted.contains("Town 4, Country"));
}

#[tokio::test]
async fn test_resolver_starts_from_existing_file() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("googlemaps_cache.jsonl");
    std::fs::write(
        &path,
        "{\"input\": \"London Great Britain\", \"output\": [51.5072, -0.1276]}\n",
    )
    .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client =
        GeocodingClient::with_base_url("test-key", &mock_server.uri(), Duration::from_secs(5))
            .unwrap();
    let mut resolver =
        GeoResolver::new(client, GeoCache::load_or_empty(&path, DEFAULT_CAPACITY));

    let coords = resolver.resolve_coordinates("London, GB").await.unwrap();
    assert_eq!(coords, (51.5072, -0.1276));
}
