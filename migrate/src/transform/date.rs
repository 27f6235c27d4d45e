//! Date tagging.
//!
//! Turns the timestamp values found in row dumps into [`TaggedDate`]s.
//! Accepted inputs:
//!
//! - RFC 3339 strings (`2024-03-01T12:00:00.123Z`)
//! - PostgreSQL text timestamps (`2024-03-01 12:00:00.123+00`, `... -03:00`)
//! - Naive timestamps, space or `T` separated (read as UTC)
//! - Bare dates (`2024-03-01`, midnight UTC)
//! - Integers, as milliseconds since the Unix epoch, as numbers or as text
//! - Already tagged objects (`{ "$date": ... }`)
//!
//! Null and blank strings tag to `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::models::TaggedDate;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Tag a raw date value read from `field`.
pub fn tag(field: &str, value: &Value) -> ValidationResult<Option<TaggedDate>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_instant(s)
            .or_else(|| {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(DateTime::from_timestamp_millis)
            })
            .map(|instant| Some(TaggedDate::new(instant)))
            .ok_or_else(|| ValidationError::invalid_date(field, s)),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64));
            millis
                .and_then(DateTime::from_timestamp_millis)
                .map(|instant| Some(TaggedDate::new(instant)))
                .ok_or_else(|| ValidationError::invalid_date(field, n))
        }
        Value::Object(map) => match map.get("$date") {
            Some(inner) if map.len() == 1 => tag(field, inner),
            _ => Err(ValidationError::invalid_date(field, value)),
        },
        other => Err(ValidationError::invalid_date(field, other)),
    }
}

/// Parse a textual timestamp into a UTC instant.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
