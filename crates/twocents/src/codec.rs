//! Wire encoding of dates.
//!
//! The API exchanges timestamps as ISO-8601 with fractional seconds. Date-only
//! values (`2025-03-01`) are also accepted on input and read as UTC midnight.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Formats a timestamp as `2025-03-01T12:00:00.123Z`.
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp (any fractional precision) or a bare date.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => Ok(date.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or(rfc_err),
    }
}

/// `#[serde(with = "crate::codec::iso8601")]`
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}
