//! End-to-end feed builds against wiremock standing in for both the sheet
//! export and the geocoding API.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tempo_feed::sheet::BROWSER_USER_AGENT;
use tempo_feed::{FeedBuilder, FeedError, RetryConfig, SheetClient};
use tempo_geo::{GeoCache, GeoResolver, GeocodingClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SHEET_ID: &str = "sheet-1";
const EXPORT_PATH: &str = "/spreadsheets/d/sheet-1/export";

const HEADER: &str = "eventId,siteName,gmtdatetime,country,city,timezone,price_male,price_female,days_before_event,currency,duration_in_minutes,soldOut,eventType,zoomInvite,region_id";

fn sheet_csv(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

fn builder(server: &MockServer, cache_path: &Path) -> FeedBuilder {
    let geocoder = GeocodingClient::with_base_url(
        "test-key",
        &format!("{}/geocode", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    let resolver = GeoResolver::new(geocoder, GeoCache::new(cache_path, 1000));
    let sheet = SheetClient::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();

    FeedBuilder::new(sheet, resolver, RetryConfig::new(3, 1, 2))
}

fn location(lat: f64, lng: f64) -> Value {
    json!({
        "status": "OK",
        "results": [{"geometry": {"location": {"lat": lat, "lng": lng}}}]
    })
}

fn header_value<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers.get(name).and_then(|v| v.to_str().ok())
}

async fn mount_geocode(server: &MockServer, address: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/geocode"))
        .and(query_param("address", address))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_builds_feed_from_listed_rows() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("events.json");

    let csv = sheet_csv(&[
        "42,tempo,2025-03-01 19:00:00,France,Paris,Europe/Paris,20.0,15.0,2,EUR,60,False,onlineSpeedDating,https://zoom.us/j/1,7",
        ",tempo,2025-03-02 19:00:00,France,Lyon,Europe/Paris,20,15,2,EUR,60,False,onlineSpeedDating,,",
        "43,othersite,2025-03-03 19:00:00,France,Nice,Europe/Paris,20,15,2,EUR,60,False,onlineSpeedDating,,",
        "44,tempo,2025-03-04 19:00:00,Nowhere,Atlantis,UTC,10,10,1,USD,45,TRUE,onlineSpeedDatingGay,,",
        "45,tempo,2025-03-05 19:00:00,France,Paris,Europe/Paris,abc,15,2,EUR,60,False,onlineSpeedDating,,",
        "46,tempo,2025-03-06 19:00:00,GB,London,Europe/London,25.5,20,3,GBP,90,false,onlineSpeedDating,,NaN",
    ]);

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .and(query_param("format", "csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv))
        .expect(1)
        .mount(&server)
        .await;

    mount_geocode(&server, "Paris, France", location(48.8566, 2.3522)).await;
    mount_geocode(&server, "London Great Britain", location(51.5072, -0.1276)).await;
    mount_geocode(
        &server,
        "Atlantis, Nowhere",
        json!({"status": "ZERO_RESULTS", "results": []}),
    )
    .await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let records = feed.build_feed(&output, 3, SHEET_ID).await.unwrap();

    let ids: Vec<i64> = records.iter().map(|r| r.event_id).collect();
    assert_eq!(ids, vec![42, 44, 46]);

    let paris = &records[0];
    assert_eq!(paris.latitude, Some(48.8566));
    assert_eq!(paris.longitude, Some(2.3522));
    assert_eq!(paris.prices[0].price, 20);
    assert_eq!(paris.prices[1].price, 15);
    assert!(!paris.sold_out);

    let atlantis = &records[1];
    assert_eq!(atlantis.latitude, None);
    assert_eq!(atlantis.longitude, None);
    assert!(atlantis.sold_out);
    assert_eq!(atlantis.title, "Online Speed Dating");

    let london = &records[2];
    assert_eq!(london.latitude, Some(51.5072));
    assert_eq!(london.prices[0].price, 25);
    assert_eq!(london.region_id, None);

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 3);
    assert_eq!(written[0]["eventId"], 42);
    assert_eq!(written[0]["region_id"], "7");
    assert!(written[1]["latitude"].is_null());

    // Resolved locations were remembered
    assert!(feed.resolver().cache().contains("Paris, France"));
    assert!(feed.resolver().cache().contains("London Great Britain"));
    assert!(!feed.resolver().cache().contains("Atlantis, Nowhere"));
}

#[tokio::test]
async fn test_export_request_looks_like_a_browser() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .and(|req: &Request| {
            header_value(req, "user-agent") == Some(BROWSER_USER_AGENT)
                && header_value(req, "accept-language") == Some("en-US,en;q=0.5")
        })
        .and(header("dnt", "1"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sheet_csv(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let records = feed
        .build_feed(&dir.path().join("events.json"), 1, SHEET_ID)
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_retries_after_server_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sheet_csv(&[
            "42,tempo,2025-03-01 19:00:00,France,Paris,Europe/Paris,20.0,15.0,2,EUR,60,False,onlineSpeedDating,,",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    mount_geocode(&server, "Paris, France", location(48.8566, 2.3522)).await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let records = feed
        .build_feed(&dir.path().join("events.json"), 3, SHEET_ID)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("events.json");

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let err = feed.build_feed(&output, 3, SHEET_ID).await.unwrap_err();

    match err {
        FeedError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_zero_retries_never_fetches() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let err = feed
        .build_feed(&dir.path().join("events.json"), 0, SHEET_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::RetriesExhausted { attempts: 0, .. }));
}

#[tokio::test]
async fn test_unwritable_output_is_not_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path(EXPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(sheet_csv(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let mut feed = builder(&server, &dir.path().join("cache.jsonl"));
    let err = feed
        .build_feed(&dir.path().join("no-such-dir").join("events.json"), 3, SHEET_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Output { .. }));
}
