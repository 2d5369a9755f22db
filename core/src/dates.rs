//! Date and timestamp decoding for the grid API.
//!
//! # Design
//! Calendar dates are strict: the wire form is exactly `YYYY-MM-DD` and
//! anything else fails the whole record. Timestamps are tolerant and are
//! tried in a fixed order:
//!
//! 1. date-time with fractional seconds,
//! 2. date-time without fractional seconds (seconds may be omitted),
//! 3. RFC 3339 with a UTC offset, keeping the written wall-clock time,
//! 4. the part before any `T` as a bare calendar date, at midnight.
//!
//! Every accepted value lands at or after midnight of its written date.
//!
//! A timestamp that matches none of these is an error; it is never turned
//! into `None`. Only an absent or `null` field decodes to `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats tried for step 1, then step 2. Both separators are accepted.
const FRACTIONAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const WHOLE_SECOND_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Output form for timestamps. The fraction is omitted when it is zero.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Errors produced while decoding a date or timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("calendar date {0:?} is not in YYYY-MM-DD form")]
    Shape(String),

    #[error("calendar date {0:?} does not exist")]
    OutOfRange(String),

    #[error("timestamp {0:?} is not an ISO-8601 date or date-time")]
    Timestamp(String),
}

/// Parse a calendar date in the exact `YYYY-MM-DD` form.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate, DateError> {
    if !has_calendar_shape(s) {
        return Err(DateError::Shape(s.to_string()));
    }
    NaiveDate::parse_from_str(s, CALENDAR_DATE_FORMAT)
        .map_err(|_| DateError::OutOfRange(s.to_string()))
}

pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

/// Parse a `created_at` timestamp using the order above.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DateError> {
    if let Some(ts) = parse_date_time(s, &FRACTIONAL_FORMATS) {
        return Ok(ts);
    }
    if let Some(ts) = parse_date_time(s, &WHOLE_SECOND_FORMATS) {
        return Ok(ts);
    }
    if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
        // The offset is dropped; converting could move the date.
        return Ok(zoned.naive_local());
    }

    let date_part = s.split('T').next().unwrap_or(s);
    parse_calendar_date(date_part)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| DateError::Timestamp(s.to_string()))
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date_time(s: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// `chrono` accepts unpadded and signed fields, so check the shape first.
fn has_calendar_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Serde adapter for `YYYY-MM-DD` fields.
pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_calendar_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for the optional `created_at` field. Pair it with
/// `#[serde(default)]` so a missing key decodes to `None`.
pub mod optional_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&super::format_timestamp(*ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse_timestamp(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
