//! Lenient readers for loosely-typed JSON fields.
//!
//! The backend and the channel publishers disagree on representations:
//! coordinates arrive as numbers or numeric strings, timestamps as RFC 3339
//! or as `YYYY-MM-DD HH:MM:SS` in UTC. These helpers accept all of them and
//! return `None` for anything else.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Read a number or a numeric string.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Read an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) timestamp.
pub fn lenient_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let Value::String(raw) = value else {
        return None;
    };
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Read a string, or the decimal rendering of a number (backend ids).
pub fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(lenient_f64(&json!(4.05)), Some(4.05));
        assert_eq!(lenient_f64(&json!(" 9.76 ")), Some(9.76));
        assert_eq!(lenient_f64(&json!(12)), Some(12.0));
        assert_eq!(lenient_f64(&json!("abc")), None);
        assert_eq!(lenient_f64(&json!("NaN")), None);
        assert_eq!(lenient_f64(&Value::Null), None);
    }

    #[test]
    fn timestamps_in_both_formats() {
        let rfc = lenient_timestamp(&json!("2026-03-14T09:10:00Z"));
        let laravel = lenient_timestamp(&json!("2026-03-14 09:10:00"));
        assert!(rfc.is_some());
        assert_eq!(rfc, laravel);
        assert!(lenient_timestamp(&json!("yesterday")).is_none());
        assert!(lenient_timestamp(&json!(1_700_000_000)).is_none());
    }

    #[test]
    fn ids_as_string_or_number() {
        assert_eq!(lenient_string(&json!(42)), Some("42".to_owned()));
        assert_eq!(lenient_string(&json!("a1")), Some("a1".to_owned()));
        assert_eq!(lenient_string(&json!(null)), None);
    }
}
