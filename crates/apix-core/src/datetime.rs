//! Date and timestamp normalization between the API wire formats and the
//! canonical in-memory representations.
//!
//! Request dates always travel as `YYYY-MM-DD`. Timestamps inside returned
//! rows arrive in one of several textual encodings, or as bare epoch numbers
//! of unknown unit; both are normalized to UTC epoch microseconds.

use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ConnectorError;

const MICROS_PER_SECOND: i64 = 1_000_000;

const REQUEST_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Accepted row timestamp encodings, tried in order.
const API_TIMESTAMP_FORMATS: [&[BorrowedFormatItem<'static>]; 6] = [
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second]"),
    format_description!("[day]/[month]/[year] [hour]:[minute]"),
    // ISO local date-time, with and without seconds/fraction
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
];

/// Formats a date in the canonical `YYYY-MM-DD` request encoding.
pub fn format_date(date: Date) -> String {
    date.format(REQUEST_DATE)
        .unwrap_or_else(|_| date.to_string())
}

/// Strictly parses a canonical `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<Date, ConnectorError> {
    Date::parse(value, REQUEST_DATE)
        .map_err(|error| ConnectorError::format(value, error.to_string()))
}

/// Parses a timestamp taken from an API row.
///
/// Tries every format of [`API_TIMESTAMP_FORMATS`], then a bare date (at
/// midnight), then an RFC 3339 instant converted to UTC.
pub fn parse_api_timestamp(value: &str) -> Result<PrimitiveDateTime, ConnectorError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(ConnectorError::format(value, "empty date/time value"));
    }

    for format in API_TIMESTAMP_FORMATS {
        if let Ok(parsed) = PrimitiveDateTime::parse(normalized, format) {
            return Ok(parsed);
        }
    }

    if let Ok(date) = Date::parse(normalized, REQUEST_DATE) {
        return Ok(date.midnight());
    }

    let instant = OffsetDateTime::parse(normalized, &Rfc3339)
        .map_err(|error| ConnectorError::format(value, error.to_string()))?
        .to_offset(UtcOffset::UTC);
    Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
}

/// Converts a UTC wall-clock date-time to epoch microseconds.
pub fn to_epoch_micros(value: PrimitiveDateTime) -> i64 {
    let utc = value.assume_utc();
    utc.unix_timestamp() * MICROS_PER_SECOND + i64::from(utc.microsecond())
}

/// Converts epoch microseconds back to a UTC wall-clock date-time.
pub fn from_epoch_micros(epoch_micros: i64) -> Result<PrimitiveDateTime, ConnectorError> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_micros) * 1_000)
        .map_err(|error| ConnectorError::format(epoch_micros.to_string(), error.to_string()))?;
    Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
}

/// Infers the unit of a bare epoch number by magnitude and returns microseconds.
///
/// `>= 1e15` is already microseconds, `>= 1e12` is milliseconds, anything
/// smaller is seconds.
pub fn normalize_epoch_number(value: i64) -> i64 {
    let absolute = value.unsigned_abs();
    if absolute >= 1_000_000_000_000_000 {
        return value;
    }
    if absolute >= 1_000_000_000_000 {
        return value * 1_000;
    }
    value * MICROS_PER_SECOND
}

/// Parses a textual row timestamp straight to epoch microseconds.
pub fn parse_timestamp_to_epoch_micros(value: &str) -> Result<i64, ConnectorError> {
    parse_api_timestamp(value).map(to_epoch_micros)
}

/// A predicate bound as handed over by the query engine.
///
/// The set of native encodings is closed; anything else arrives as
/// [`DateBound::Unsupported`] and is rejected on conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBound {
    /// Timestamp with microsecond precision.
    EpochMicros(i64),
    /// Timestamp with sub-microsecond precision; the picosecond part is ignored.
    LongTimestamp { epoch_micros: i64, picos_of_micro: u32 },
    Date(Date),
    DateTime(PrimitiveDateTime),
    /// Textual timestamp in any of the API encodings.
    Text(String),
    Unsupported { type_name: String },
}

impl DateBound {
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Self::Unsupported {
            type_name: type_name.into(),
        }
    }

    pub fn to_date(&self) -> Result<Date, ConnectorError> {
        match self {
            Self::EpochMicros(epoch_micros) => from_epoch_micros(*epoch_micros).map(|dt| dt.date()),
            Self::LongTimestamp { epoch_micros, .. } => {
                from_epoch_micros(*epoch_micros).map(|dt| dt.date())
            }
            Self::Date(date) => Ok(*date),
            Self::DateTime(date_time) => Ok(date_time.date()),
            Self::Text(text) => parse_api_timestamp(text).map(|dt| dt.date()),
            Self::Unsupported { type_name } => Err(ConnectorError::UnsupportedType {
                type_name: type_name.clone(),
            }),
        }
    }
}

/// Normalizes any accepted predicate bound to a calendar date.
pub fn to_date_from_bound(bound: &DateBound) -> Result<Date, ConnectorError> {
    bound.to_date()
}

impl From<&serde_json::Value> for DateBound {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Number(number) => match number.as_i64() {
                Some(epoch_micros) => Self::EpochMicros(epoch_micros),
                None => Self::unsupported("float"),
            },
            Value::String(text) => Self::Text(text.clone()),
            Value::Null => Self::unsupported("null"),
            Value::Bool(_) => Self::unsupported("boolean"),
            Value::Array(_) => Self::unsupported("array"),
            Value::Object(_) => Self::unsupported("object"),
        }
    }
}
