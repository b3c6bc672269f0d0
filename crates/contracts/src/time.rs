//! Timestamp parsing, formatting and distance helpers.

use chrono::{DateTime, NaiveDateTime, Timelike};

use crate::ContractError;

/// Frame timestamp (sensor wall clock, no timezone)
pub type Timestamp = NaiveDateTime;

/// On-disk representation, fixed to microsecond width.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const FALLBACK_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601-like timestamp.
///
/// Accepts RFC 3339 with an offset (normalized to UTC), `T`-separated and
/// space-separated forms, with or without fractional seconds. Sub-microsecond
/// digits are truncated so a parsed value survives [`format_timestamp`].
pub fn parse_timestamp(value: &str) -> Result<Timestamp, ContractError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(truncate_to_micros(dt.naive_utc()));
    }

    for format in FALLBACK_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(truncate_to_micros(ts));
        }
    }

    Err(ContractError::InvalidTimestamp {
        value: value.to_string(),
        message: "expected ISO-8601 date and time".to_string(),
    })
}

fn truncate_to_micros(ts: Timestamp) -> Timestamp {
    let nanos = ts.nanosecond();
    ts.with_nanosecond(nanos - nanos % 1_000).unwrap_or(ts)
}

/// Format a timestamp the way it is persisted.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Signed distance `to - from` in seconds.
pub fn seconds_between(from: &Timestamp, to: &Timestamp) -> f64 {
    let delta = to.signed_duration_since(*from);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Absolute distance between two timestamps in seconds.
#[inline]
pub fn skew_seconds(a: &Timestamp, b: &Timestamp) -> f64 {
    seconds_between(a, b).abs()
}

pub(crate) mod serde_format {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_timestamp, parse_timestamp, Timestamp};

    pub fn serialize<S>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
