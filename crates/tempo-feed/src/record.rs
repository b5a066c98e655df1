//! Feed records built from spreadsheet rows.

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;
use crate::sheet::SourceRow;

pub const EVENT_TITLE: &str = "Online Speed Dating";
const GAY_EVENT_TYPE: &str = "onlineSpeedDatingGay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// A ticket price tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub price: i64,
    pub gender: Gender,
    #[serde(rename = "daysBeforeEvent")]
    pub days_before_event: i64,
}

/// One event in the published feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "gmtdatetime")]
    pub gmt_datetime: Option<String>,
    pub title: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub prices: Vec<Price>,
    pub currency: Option<String>,
    pub duration_in_minutes: i64,
    #[serde(rename = "soldOut")]
    pub sold_out: bool,
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    #[serde(rename = "zoomInvite")]
    pub zoom_invite: Option<String>,
    pub region_id: Option<String>,
}

impl EventRecord {
    /// Build a record without coordinates from a listed row.
    pub fn from_row(row: &SourceRow) -> Result<Self, ConversionError> {
        let event_id = truncated(row, "eventId")?;
        let price_male = truncated(row, "price_male")?;
        let price_female = truncated(row, "price_female")?;
        let days_before_event = truncated(row, "days_before_event")?;
        let duration_in_minutes = truncated(row, "duration_in_minutes")?;

        let event_type = text(row, "eventType");
        if let Some(label) = audience_label(event_type.as_deref()) {
            tracing::debug!("Event {} audience: {}", event_id, label);
        }

        Ok(Self {
            event_id,
            gmt_datetime: text(row, "gmtdatetime"),
            title: EVENT_TITLE.to_string(),
            country: text(row, "country"),
            city: text(row, "city"),
            latitude: None,
            longitude: None,
            timezone: text(row, "timezone"),
            prices: vec![
                Price {
                    price: price_male,
                    gender: Gender::Male,
                    days_before_event,
                },
                Price {
                    price: price_female,
                    gender: Gender::Female,
                    days_before_event,
                },
            ],
            currency: text(row, "currency"),
            duration_in_minutes,
            sold_out: row
                .get("soldOut")
                .is_some_and(|v| v.to_lowercase() == "true"),
            event_type,
            zoom_invite: text(row, "zoomInvite"),
            region_id: text(row, "region_id"),
        })
    }

    /// Attach resolved coordinates; `None` leaves both null.
    pub fn with_coordinates(mut self, coords: Option<(f64, f64)>) -> Self {
        self.latitude = coords.map(|c| c.0);
        self.longitude = coords.map(|c| c.1);
        self
    }

    /// The `"{city}, {country}"` query, when both are known.
    pub fn location_query(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            _ => None,
        }
    }
}

/// Audience shown for an event type, if it has one.
pub fn audience_label(event_type: Option<&str>) -> Option<&'static str> {
    (event_type == Some(GAY_EVENT_TYPE)).then_some("For Gay men")
}

fn text(row: &SourceRow, field: &str) -> Option<String> {
    row.get(field).map(str::to_string)
}

/// Parse a cell as a float and truncate toward zero.
fn truncated(row: &SourceRow, field: &'static str) -> Result<i64, ConversionError> {
    let raw = row.get(field).ok_or(ConversionError::Missing { field })?;
    let invalid = || ConversionError::Invalid {
        field,
        value: raw.to_string(),
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    let value = value.trunc();
    // i64::MAX is not representable; 2^63 is the first value out of range
    if !value.is_finite() || value < i64::MIN as f64 || value >= -(i64::MIN as f64) {
        return Err(invalid());
    }

    Ok(value as i64)
}
