//! Feed build errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole feed build.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Could not fetch sheet after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write feed to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode feed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FeedError {
    /// Whether another run later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

/// A row field that could not be coerced. The row is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("missing value for {field}")]
    Missing { field: &'static str },

    #[error("invalid value for {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}
