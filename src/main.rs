use anyhow::{Context, Result};
use tempo_core::{Config, ConfigError, API_KEY_ENV};
use tempo_feed::FeedBuilder;
use tempo_geo::GeoResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    tempo_core::init()?;

    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let api_key = config
        .geocoding
        .resolved_api_key()
        .ok_or_else(|| ConfigError::MissingSetting(format!("geocoding.api_key or {}", API_KEY_ENV)))?;

    let resolver = GeoResolver::from_config(&config, &api_key)?;
    tracing::info!(
        "Loaded {} cached geocoding entries from {} (keeping {})",
        resolver.cache().len(),
        resolver.cache().path().display(),
        resolver.cache().capacity()
    );

    let mut builder = FeedBuilder::from_config(&config, resolver)?;
    let records = match builder
        .build_feed(
            &config.sheet.output_path,
            config.sheet.max_retries,
            &config.sheet.sheet_id,
        )
        .await
    {
        Ok(records) => records,
        Err(e) => {
            if e.is_transient() {
                tracing::warn!("Sheet export unreachable, the next scheduled run may succeed");
            }
            return Err(e).context("Feed build failed");
        }
    };

    tracing::info!(
        "Feed ready: {} events in {}",
        records.len(),
        config.sheet.output_path.display()
    );

    Ok(())
}
