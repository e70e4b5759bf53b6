//! Lenient field lookup over loosely-shaped backend payloads.
//!
//! The backend mixes `PascalCase` keys from its ORM base model (`ID`,
//! `CreatedAt`) with `snake_case` and `camelCase` keys from hand-written
//! handlers. Each accessor takes an ordered list of candidate field names and
//! returns the first one that is present and non-null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// First candidate field that is present and not `null`.
#[must_use]
pub fn field<'a>(raw: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|key| raw.get(key))
        .find(|value| !value.is_null())
}

/// Unsigned integer field. Numeric strings are accepted.
#[must_use]
pub fn u64_field(raw: &Value, candidates: &[&str]) -> Option<u64> {
    field(raw, candidates).and_then(as_u64)
}

/// String field. Numbers and booleans are rendered as text.
#[must_use]
pub fn str_field(raw: &Value, candidates: &[&str]) -> Option<String> {
    field(raw, candidates).and_then(|value| match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Boolean field. Accepts `true`/`false`, `1`/`0` and their string forms.
#[must_use]
pub fn bool_field(raw: &Value, candidates: &[&str]) -> Option<bool> {
    field(raw, candidates).and_then(|value| match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Array field; an absent or non-array value yields an empty slice.
#[must_use]
pub fn array_field<'a>(raw: &'a Value, candidates: &[&str]) -> &'a [Value] {
    field(raw, candidates)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// RFC 3339 timestamp field; unparseable values are treated as absent.
#[must_use]
pub fn timestamp_field(raw: &Value, candidates: &[&str]) -> Option<DateTime<Utc>> {
    field(raw, candidates)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interpret a JSON value as an unsigned integer.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Checked non-negative and integral
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strip the backend's `{"data": ...}` envelope when present.
#[must_use]
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Human-readable error text from an error body (`message`, then `error`).
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    str_field(body, &["message", "error"]).filter(|s| !s.trim().is_empty())
}

/// Deserialize an optional id that may arrive as a number, a numeric
/// string, or `null`.
///
/// # Errors
///
/// Never fails on well-formed JSON; unrecognized shapes become `None`.
pub fn lenient_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<u64>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_u64(&value).map(T::from))
}
