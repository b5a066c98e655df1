//! Spreadsheet export to JSON feed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tempo_core::Config;
use tempo_geo::GeoResolver;

use crate::error::FeedError;
use crate::record::EventRecord;
use crate::retry::{with_backoff, RetryConfig};
use crate::sheet::{parse_rows, SheetClient};

/// Fetches the sheet, turns listed rows into records, and writes the feed.
pub struct FeedBuilder {
    sheet: SheetClient,
    resolver: GeoResolver,
    retry: RetryConfig,
}

impl FeedBuilder {
    pub fn new(sheet: SheetClient, resolver: GeoResolver, retry: RetryConfig) -> Self {
        Self {
            sheet,
            resolver,
            retry,
        }
    }

    pub fn from_config(config: &Config, resolver: GeoResolver) -> Result<Self, FeedError> {
        let sheet = SheetClient::with_base_url(
            &config.sheet.export_base_url,
            Duration::from_secs(config.sheet.request_timeout_secs),
        )?;
        let retry = RetryConfig::new(
            config.sheet.max_retries,
            config.sheet.retry_min_delay_ms,
            config.sheet.retry_max_delay_ms,
        );

        Ok(Self::new(sheet, resolver, retry))
    }

    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    /// Build the feed for `sheet_id` and write it to `output_path`.
    ///
    /// Only the fetch is retried, `max_retries` attempts in total. Rows that
    /// fail to convert are skipped; rows whose location cannot be resolved
    /// keep null coordinates.
    pub async fn build_feed(
        &mut self,
        output_path: &Path,
        max_retries: u32,
        sheet_id: &str,
    ) -> Result<Vec<EventRecord>, FeedError> {
        let retry = self.retry.with_attempts(max_retries);
        let sheet = &self.sheet;
        let body = with_backoff(&retry, || sheet.fetch_csv(sheet_id)).await?;

        let rows = parse_rows(&body)?;
        let total = rows.len();
        let listed: Vec<_> = rows.into_iter().filter(|row| row.is_listed()).collect();
        tracing::info!("Filtered {} valid rows from {} total rows", listed.len(), total);

        let mut records = Vec::with_capacity(listed.len());
        for row in &listed {
            let record = match EventRecord::from_row(row) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        "Skipping row with eventId {:?}: {}",
                        row.get("eventId").unwrap_or_default(),
                        e
                    );
                    continue;
                }
            };

            if record.event_id == 0 {
                tracing::debug!("Skipping row with zero eventId");
                continue;
            }

            let coords = self.locate(&record).await;
            records.push(record.with_coordinates(coords));
        }

        write_feed(output_path, &records)?;
        tracing::info!(
            "Wrote {} events to {}",
            records.len(),
            output_path.display()
        );

        Ok(records)
    }

    async fn locate(&mut self, record: &EventRecord) -> Option<(f64, f64)> {
        let Some(query) = record.location_query() else {
            tracing::warn!(
                "Event {} has no city/country, leaving coordinates empty",
                record.event_id
            );
            return None;
        };

        match self.resolver.resolve_coordinates(&query).await {
            Ok(coords) => Some(coords),
            Err(e) => {
                tracing::warn!("Could not resolve {:?} for event {}: {}", query, record.event_id, e);
                None
            }
        }
    }
}

/// Write records as a JSON array indented by four spaces.
pub fn write_feed(path: &Path, records: &[EventRecord]) -> Result<(), FeedError> {
    let output_err = |source| FeedError::Output {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(output_err)?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    records.serialize(&mut serializer)?;

    writer.flush().map_err(output_err)?;
    Ok(())
}
