//! Event feed generation from the spreadsheet export.

pub mod error;
pub mod retry;
pub mod sheet;
pub mod record;
pub mod builder;

pub use error::{ConversionError, FeedError};
pub use retry::RetryConfig;
pub use sheet::{SheetClient, SourceRow};
pub use record::{EventRecord, Gender, Price};
pub use builder::FeedBuilder;
