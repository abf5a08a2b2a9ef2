use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset, Weekday};

// Magnitude floors for epoch disambiguation: raw values above 1e14 are
// microseconds, above 1e11 milliseconds, anything else seconds. Source logs
// never self-describe their time unit.
const EPOCH_MILLIS_FLOOR: f64 = 1e11;
const EPOCH_MICROS_FLOOR: f64 = 1e14;

// Unix milliseconds for 9999-12-31T23:59:59Z; anything later is garbage.
const MAX_SUPPORTED_UNIX_MS: f64 = 253_402_300_799_000.0;

const NANOS_PER_MILLI: i128 = 1_000_000;
const MILLIS_PER_DAY: u64 = 86_400_000;

/// Candidate key names for event timestamps, in resolution order. The first
/// key present ends the search, even when its value fails to resolve.
pub const TIMESTAMP_CANDIDATE_KEYS: &[&str] = &[
    "timestamp",
    "time",
    "ts",
    "created",
    "created_at",
    "datetime",
    "date",
];

/// Resolves a raw JSON value of unknown encoding to unix milliseconds.
/// Malformed input is unresolvable, never an error.
#[must_use]
pub fn resolve_raw_timestamp(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => resolve_epoch_number(number.as_f64()?),
        Value::String(text) => resolve_datetime_text(text),
        _ => None,
    }
}

/// Pulls a timestamp out of an event object, trying the candidate keys at
/// the top level first and inside a nested `payload` mapping second.
#[must_use]
pub fn extract_event_timestamp(event: &Value) -> Option<u64> {
    let object = event.as_object()?;

    for key in TIMESTAMP_CANDIDATE_KEYS {
        if let Some(raw) = object.get(*key) {
            return resolve_raw_timestamp(raw);
        }
    }

    if let Some(payload) = object.get("payload").and_then(Value::as_object) {
        for key in TIMESTAMP_CANDIDATE_KEYS {
            if let Some(raw) = payload.get(*key) {
                return resolve_raw_timestamp(raw);
            }
        }
    }

    None
}

fn resolve_epoch_number(raw: f64) -> Option<u64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }

    let unix_ms = if raw > EPOCH_MICROS_FLOOR {
        raw / 1_000.0
    } else if raw > EPOCH_MILLIS_FLOOR {
        raw
    } else {
        raw * 1_000.0
    };

    if unix_ms > MAX_SUPPORTED_UNIX_MS {
        return None;
    }

    Some(unix_ms as u64)
}

fn resolve_datetime_text(text: &str) -> Option<u64> {
    let candidate = text.trim();
    if candidate.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return to_unix_ms(parsed);
    }

    // Naive ISO-8601 stamps carry no offset; read them as UTC.
    let assumed_utc = format!("{candidate}Z");
    let parsed = OffsetDateTime::parse(&assumed_utc, &Rfc3339).ok()?;
    to_unix_ms(parsed)
}

fn to_unix_ms(parsed: OffsetDateTime) -> Option<u64> {
    let unix_ms = parsed.unix_timestamp_nanos() / NANOS_PER_MILLI;
    u64::try_from(unix_ms).ok()
}

#[must_use]
pub fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[must_use]
pub fn format_unix_ms(timestamp_unix_ms: u64) -> String {
    let nanos = i128::from(timestamp_unix_ms)
        .checked_mul(NANOS_PER_MILLI)
        .unwrap_or(i128::MAX);
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .expect("valid unix milliseconds must convert to datetime")
        .to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}

/// Integer hour of day (0-23) of a unix-ms timestamp, in UTC.
#[must_use]
pub fn hour_of_day(timestamp_unix_ms: u64) -> Option<u8> {
    utc_datetime(timestamp_unix_ms).map(|dt| dt.hour())
}

/// English weekday name of a unix-ms timestamp, in UTC.
#[must_use]
pub fn weekday_name(timestamp_unix_ms: u64) -> Option<&'static str> {
    let weekday = utc_datetime(timestamp_unix_ms)?.weekday();
    Some(match weekday {
        Weekday::Monday => "Monday",
        Weekday::Tuesday => "Tuesday",
        Weekday::Wednesday => "Wednesday",
        Weekday::Thursday => "Thursday",
        Weekday::Friday => "Friday",
        Weekday::Saturday => "Saturday",
        Weekday::Sunday => "Sunday",
    })
}

/// Whole days elapsed between two unix-ms timestamps.
#[must_use]
pub fn span_whole_days(first_unix_ms: u64, last_unix_ms: u64) -> u64 {
    last_unix_ms.saturating_sub(first_unix_ms) / MILLIS_PER_DAY
}

fn utc_datetime(timestamp_unix_ms: u64) -> Option<OffsetDateTime> {
    let nanos = i128::from(timestamp_unix_ms).checked_mul(NANOS_PER_MILLI)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
}
