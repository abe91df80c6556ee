//! Scalar field values: type checks, normalisation and coercion from text.

use crate::config::FieldType;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Canonical text form for timestamp values (UTC, microseconds, `Z` suffix).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now() -> Value {
    Value::String(format_timestamp(Utc::now()))
}

/// Check `value` against `field_type` and return its canonical form. Null passes through;
/// nullability is the caller's concern.
pub fn normalize(field_type: FieldType, value: &Value) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match field_type {
        FieldType::Text => match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(format!("expected text, got {}", json_type_name(other))),
        },
        FieldType::Integer => value
            .as_i64()
            .map(Value::from)
            .ok_or_else(|| format!("expected integer, got {}", value)),
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(format!("expected boolean, got {}", json_type_name(other))),
        },
        FieldType::Float => value
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("expected number, got {}", value)),
        FieldType::Timestamp => {
            let s = value
                .as_str()
                .ok_or_else(|| format!("expected RFC 3339 timestamp, got {}", json_type_name(value)))?;
            let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| format!("bad timestamp '{}': {}", s, e))?;
            Ok(Value::String(format_timestamp(parsed.with_timezone(&Utc))))
        }
        FieldType::Json => Ok(value.clone()),
    }
}

/// Coerce a path or query-string value to the field's type. Falls back to text when
/// the string does not parse, so normalisation reports the mismatch.
pub fn from_text(field_type: FieldType, s: &str) -> Value {
    match field_type {
        FieldType::Integer => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::String(s.to_string())),
        FieldType::Float => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.to_string())),
        FieldType::Boolean => {
            if s.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if s.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                Value::String(s.to_string())
            }
        }
        FieldType::Json => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())),
        FieldType::Text | FieldType::Timestamp => Value::String(s.to_string()),
    }
}

pub fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_are_canonical_utc() {
        let v = normalize(FieldType::Timestamp, &json!("2024-03-01T10:00:00+02:00")).unwrap();
        assert_eq!(v, json!("2024-03-01T08:00:00.000000Z"));
        let again = normalize(FieldType::Timestamp, &v).unwrap();
        assert_eq!(again, v);
    }

    #[test]
    fn type_mismatches_are_rejected() {
        assert!(normalize(FieldType::Text, &json!(5)).is_err());
        assert!(normalize(FieldType::Integer, &json!("5")).is_err());
        assert!(normalize(FieldType::Integer, &json!(1.5)).is_err());
        assert!(normalize(FieldType::Boolean, &json!("true")).is_err());
        assert!(normalize(FieldType::Timestamp, &json!("yesterday")).is_err());
    }

    #[test]
    fn null_and_json_pass_through() {
        assert_eq!(normalize(FieldType::Integer, &Value::Null).unwrap(), Value::Null);
        let doc = json!({"nested": [1, 2]});
        assert_eq!(normalize(FieldType::Json, &doc).unwrap(), doc);
    }

    #[test]
    fn text_coercion() {
        assert_eq!(from_text(FieldType::Integer, "22"), json!(22));
        assert_eq!(from_text(FieldType::Integer, "x"), json!("x"));
        assert_eq!(from_text(FieldType::Boolean, "TRUE"), json!(true));
        assert_eq!(from_text(FieldType::Float, "2.5"), json!(2.5));
        assert_eq!(from_text(FieldType::Text, "22"), json!("22"));
    }
}
