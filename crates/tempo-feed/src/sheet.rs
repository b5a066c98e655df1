//! Spreadsheet CSV export: fetching and row decoding.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{header, Client};

pub const EXPORT_BASE_URL: &str = "https://docs.google.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

// Export requests present themselves as a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/csv,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Cell values read as "no value" (the pandas default NA set).
pub const NA_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Fetches a spreadsheet as CSV text.
#[derive(Debug, Clone)]
pub struct SheetClient {
    client: Client,
    base_url: String,
}

impl SheetClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_url(EXPORT_BASE_URL, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Export URL for a sheet id.
    pub fn export_url(&self, sheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/d/{}/export?format=csv",
            self.base_url,
            urlencoding::encode(sheet_id)
        )
    }

    fn build_request(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ACCEPT, BROWSER_ACCEPT)
            .header(header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .header(header::DNT, "1")
            .header(header::CONNECTION, "keep-alive")
            .header(header::UPGRADE_INSECURE_REQUESTS, "1")
    }

    /// One fetch attempt. Non-2xx statuses come back as errors.
    pub async fn fetch_csv(&self, sheet_id: &str) -> Result<String, reqwest::Error> {
        let url = self.export_url(sheet_id);
        tracing::debug!("GET {}", url);

        let response = self
            .build_request(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?;

        response.text().await
    }
}

/// One data row keyed by header name, with NA markers already dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    cells: HashMap<String, String>,
}

impl SourceRow {
    /// Present, non-NA cell value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let column = column.into();
        if is_na(&value) {
            self.cells.remove(&column);
        } else {
            self.cells.insert(column, value);
        }
    }

    /// Rows that belong in the feed: an event id and the `tempo` site.
    pub fn is_listed(&self) -> bool {
        self.get("eventId").is_some() && self.get("siteName") == Some("tempo")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = SourceRow::default();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

pub fn is_na(value: &str) -> bool {
    NA_MARKERS.contains(&value)
}

/// Decode CSV text with a header line into rows.
///
/// Short records leave their trailing columns empty; extra cells past the
/// header are ignored.
pub fn parse_rows(text: &str) -> Result<Vec<SourceRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: SourceRow = headers
            .iter()
            .zip(record.iter())
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
