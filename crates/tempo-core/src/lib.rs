pub mod config;
pub mod error;

pub use config::{Config, GeocodingConfig, SheetConfig, ValidationResult, API_KEY_ENV};
pub use error::ConfigError;

use anyhow::Result;

/// Initialize logging for the binary
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("tempo core initialized");
    Ok(())
}
