//! Scalar coercion from loosely-typed JSON slots into typed cells.
//!
//! Absent and null slots become [`Value::Null`]. A value that cannot be coerced is never
//! dropped or defaulted: it is passed through as [`Value::Utf8`] so the rule engine can report a
//! type violation for it.

use serde_json::Value as JsonValue;

use crate::raw::Presence;
use crate::types::Value;

/// Text cell. Non-string scalars are rendered as text.
pub fn text(slot: &Presence<JsonValue>) -> Value {
    match slot.value() {
        Some(v) => passthrough(v),
        None => Value::Null,
    }
}

/// Integer cell. Accepts integers, whole-valued floats and numeric strings.
pub fn integer(slot: &Presence<JsonValue>) -> Value {
    let Some(v) = slot.value() else {
        return Value::Null;
    };
    let parsed = match v {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_f64_to_i64)),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(whole_f64_to_i64))
        }
        _ => None,
    };
    parsed.map(Value::Int64).unwrap_or_else(|| passthrough(v))
}

/// Floating point cell. Accepts numbers and numeric strings.
pub fn number(slot: &Presence<JsonValue>) -> Value {
    let Some(v) = slot.value() else {
        return Value::Null;
    };
    let parsed = match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(Value::Float64)
        .unwrap_or_else(|| passthrough(v))
}

/// Boolean cell. Accepts booleans, `0`/`1` and the usual textual spellings.
pub fn boolean(slot: &Presence<JsonValue>) -> Value {
    let Some(v) = slot.value() else {
        return Value::Null;
    };
    let parsed = match v {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        JsonValue::String(s) => parse_bool(s.trim()),
        _ => None,
    };
    parsed.map(Value::Bool).unwrap_or_else(|| passthrough(v))
}

/// List cell for classification arrays, encoded with [`super::ListCodec`].
///
/// Arrays keep their non-blank elements; a bare string is a one-element list; absent and
/// null slots are the empty list. Always produces a string, never null.
pub fn string_list(slot: &Presence<JsonValue>) -> Vec<String> {
    match slot.value() {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::Null => None,
                JsonValue::String(s) if s.trim().is_empty() => None,
                JsonValue::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(JsonValue::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(JsonValue::String(_)) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn whole_f64_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn passthrough(v: &JsonValue) -> Value {
    match v {
        JsonValue::String(s) => Value::Utf8(s.clone()),
        other => Value::Utf8(other.to_string()),
    }
}
