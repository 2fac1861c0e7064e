//! Helpers for inspecting untyped field values.
//!
//! Field values are plain [`serde_json::Value`]s. An absent value is
//! represented as [`Value::Null`].

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::EvaluatorFault;

/// Snapshot of field values keyed by field name, in insertion order.
pub type FieldValues = IndexMap<String, Value>;

/// Returns `true` for values the `required` rule rejects: null and `""`.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Equality used by comparisons and `field_match`.
///
/// Numbers compare by numeric value, so `5` equals `5.0`. Everything else
/// compares structurally.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two values when they are comparable.
///
/// Numbers compare numerically and strings lexicographically. Any other
/// pairing is incomparable, which makes every ordering comparison false.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Counts distinct primitive items the way a set of primitives would.
///
/// Strings, numbers, booleans and null are deduplicated by value. Arrays and
/// objects are never considered equal to one another.
#[must_use]
pub fn has_duplicate_primitives(items: &[Value]) -> bool {
    let mut seen: Vec<&Value> = Vec::with_capacity(items.len());
    for item in items {
        if matches!(item, Value::Array(_) | Value::Object(_)) {
            continue;
        }
        if seen.iter().any(|prev| values_equal(prev, item)) {
            return true;
        }
        seen.push(item);
    }
    false
}

/// Renders a rule parameter for use inside a message.
///
/// Strings are inserted verbatim, whole numbers lose their fractional part.
#[must_use]
pub fn display_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), display_number),
        other => other.to_string(),
    }
}

/// Formats a number without a trailing `.0` when it is whole.
#[must_use]
pub fn display_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Coerces a date-like value into a UTC timestamp.
///
/// - `null` and blank strings yield `Ok(None)`: there is nothing to check.
/// - Numbers are milliseconds since the Unix epoch.
/// - Strings accept RFC 3339, ISO 8601 with a `+HHMM` offset, and the
///   naive forms `YYYY-MM-DDTHH:MM[:SS[.fff]]` (`T` or space) and
///   `YYYY-MM-DD`, read as UTC.
/// - Booleans, arrays and objects are not date-like and yield `Ok(None)`.
///
/// A number or string that cannot be read as a date is a fault.
pub fn coerce_date(value: &Value) -> Result<Option<DateTime<Utc>>, EvaluatorFault> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| ms.is_finite())
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
            .map(Some)
            .ok_or_else(|| EvaluatorFault::invalid_date(value)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| EvaluatorFault::invalid_date(value)),
        _ => Ok(None),
    }
}

fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), true)]
    #[case(json!(""), true)]
    #[case(json!(" "), false)]
    #[case(json!(0), false)]
    #[case(json!(false), false)]
    #[case(json!([]), false)]
    fn blank_values(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_blank(&value), expected);
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(5), &json!(5.0)));
        assert!(!values_equal(&json!(5), &json!("5")));
        assert_eq!(compare_values(&json!(2), &json!(10)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }

    #[test]
    fn duplicates_ignore_composites() {
        assert!(has_duplicate_primitives(&[json!(1), json!(2), json!(2)]));
        assert!(!has_duplicate_primitives(&[json!(1), json!(2), json!(3)]));
        assert!(!has_duplicate_primitives(&[json!({"a": 1}), json!({"a": 1})]));
        assert!(has_duplicate_primitives(&[json!("x"), json!(null), json!("x")]));
    }

    #[test]
    fn params_render_like_messages() {
        assert_eq!(display_param(&json!(5)), "5");
        assert_eq!(display_param(&json!(5.0)), "5");
        assert_eq!(display_param(&json!(2.5)), "2.5");
        assert_eq!(display_param(&json!("2024-01-01")), "2024-01-01");
    }

    #[test]
    fn dates_coerce_from_common_shapes() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(coerce_date(&json!("2024-03-01")).unwrap(), Some(midnight));
        assert_eq!(
            coerce_date(&json!("2024-03-01T00:00:00Z")).unwrap(),
            Some(midnight)
        );
        assert_eq!(
            coerce_date(&json!("2024-03-01T00:00:00")).unwrap(),
            Some(midnight)
        );
        assert_eq!(
            coerce_date(&json!(midnight.timestamp_millis())).unwrap(),
            Some(midnight)
        );
        assert_eq!(coerce_date(&json!(null)).unwrap(), None);
        assert_eq!(coerce_date(&json!("  ")).unwrap(), None);
        assert_eq!(coerce_date(&json!(true)).unwrap(), None);
    }

    #[rstest]
    #[case("2025-01-15T10:00")]
    #[case("2025-01-15 10:00")]
    #[case("2025-01-15T10:00:00.000+0000")]
    #[case("2025-01-15T12:00:00+0200")]
    #[case("2025-01-15T10:00:00.000Z")]
    fn dates_coerce_from_form_inputs(#[case] input: &str) {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(coerce_date(&json!(input)).unwrap(), Some(expected));
    }

    #[test]
    fn unreadable_dates_are_faults() {
        assert!(matches!(
            coerce_date(&json!("next tuesday")),
            Err(EvaluatorFault::InvalidDate { .. })
        ));
    }
}
