//! Scheduled-date normalization
//!
//! Every place that turns a stored or submitted date into an instant goes
//! through this module. The fallback policy is single and strict: anything
//! that cannot be read as a point in time becomes `None`. Nothing here ever
//! substitutes epoch zero or "now" for a bad value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Naive datetime layouts read as UTC (SQLite `CURRENT_TIMESTAMP` style and
/// ISO without offset). `%.f` makes the fractional part optional.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Smallest value read as epoch milliseconds (twelve digits, 1973-03-03).
/// Anything lower is Unix seconds (`1718010000`) or a compact date
/// (`20240610`) and would land in January 1970.
const MIN_EPOCH_MILLIS: i64 = 100_000_000_000;

/// Parse a scheduled date from its textual form.
///
/// Accepted, in order:
/// - RFC 3339 with any offset (normalized to UTC)
/// - naive `YYYY-MM-DD HH:MM[:SS[.fff]]`, with space or `T`, read as UTC
/// - date-only `YYYY-MM-DD`, read as UTC midnight
/// - an all-digit string of at least twelve digits, read as epoch milliseconds
pub fn parse_scheduled_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<i64>().ok().and_then(from_epoch_millis);
    }

    None
}

/// Epoch milliseconds to an instant.
///
/// `None` below twelve digits (see `MIN_EPOCH_MILLIS`) or out of chrono's range.
pub fn from_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    if ms < MIN_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(ms)
}

/// Read a date out of an arbitrary JSON value.
///
/// Strings go through [`parse_scheduled_date`], numbers are epoch millis, and
/// objects are document-store timestamps (`{"seconds", "nanoseconds"}`, or the
/// underscored `_seconds` / `_nanoseconds` export spelling).
pub fn from_json_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_scheduled_date(s),
        Value::Number(n) => {
            let ms = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            from_epoch_millis(ms)
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = match map.get("nanoseconds").or_else(|| map.get("_nanoseconds")) {
                Some(v) => v.as_u64()?,
                None => 0,
            };
            if nanos >= 1_000_000_000 {
                return None;
            }
            DateTime::from_timestamp(seconds, nanos as u32)
        }
        _ => None,
    }
}

/// Serde `deserialize_with` helper for optional dates.
///
/// Never fails on a bad value: malformed dates deserialize as `None`. Pair it
/// with `#[serde(default)]` so a missing field also reads as `None`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(from_json_value))
}

/// Serde `deserialize_with` helper for optional dates that must not be lost.
///
/// Absent or `null` reads as `None`; a present value that cannot be read as a
/// date is a deserialization error instead of silently becoming `None`. Pair
/// it with `#[serde(default)]`.
pub fn deserialize_strict<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => from_json_value(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("unreadable date: {}", value))),
    }
}

/// Whole days from `from`'s UTC calendar date to `to`'s UTC calendar date.
///
/// Time of day is ignored: 09:00 and 23:00 on the same UTC date are 0 days
/// apart, 23:59 and 00:01 the next morning are 1 day apart.
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}
