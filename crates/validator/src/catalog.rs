//! Built-in rule behavior.
//!
//! Every [`Check`] is matched exhaustively here. Rules that only apply to one
//! type (strings, numbers, arrays, dates) pass silently when given a value of
//! another type; `required` is the rule for rejecting missing values.

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::condition::evaluate_condition;
use crate::context::ValidationContext;
use crate::error::EvaluatorFault;
use crate::rule::{Check, CompareOperator, Rule};
use crate::value::{
    FieldValues, coerce_date, compare_values, display_number, display_param,
    has_duplicate_primitives, is_blank, values_equal,
};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"));

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-+()]*$").expect("phone regex compiles"));

static EMPTY_VALUES: LazyLock<FieldValues> = LazyLock::new(FieldValues::new);

/// Outcome of a built-in rule: `None` passes, `Some(message)` fails.
pub type BuiltinResult = Result<Option<String>, EvaluatorFault>;

/// Evaluates `rule` with its built-in behavior, ignoring any custom checks.
///
/// `now` is the evaluation-time clock used by `date_future` and `date_past`.
pub fn evaluate_builtin(
    rule: &Rule,
    value: &Value,
    context: Option<&ValidationContext>,
    now: DateTime<Utc>,
) -> BuiltinResult {
    let message = |default: String| Some(rule.message.clone().unwrap_or(default));

    let outcome = match &rule.check {
        Check::Required => {
            if is_blank(value) {
                message("This field is required".to_owned())
            } else {
                None
            }
        }

        Check::MinLength(min) => as_str(value)
            .filter(|s| s.chars().count() < *min)
            .and_then(|_| message(format!("Minimum length is {min} characters"))),
        Check::MaxLength(max) => as_str(value)
            .filter(|s| s.chars().count() > *max)
            .and_then(|_| message(format!("Maximum length is {max} characters"))),
        Check::Pattern(pattern) => as_str(value)
            .filter(|s| !pattern.is_match(s))
            .and_then(|_| message("Invalid format".to_owned())),
        Check::Email => as_str(value)
            .filter(|s| !EMAIL_REGEX.is_match(s))
            .and_then(|_| message("Invalid email address".to_owned())),
        Check::Url => as_str(value)
            .filter(|s| url::Url::parse(s).is_err())
            .and_then(|_| message("Invalid URL".to_owned())),
        Check::Phone => as_str(value)
            .filter(|s| !PHONE_REGEX.is_match(s))
            .and_then(|_| message("Invalid phone number".to_owned())),

        Check::Min(min) => as_number(value)
            .filter(|n| n < min)
            .and_then(|_| message(format!("Minimum value is {}", display_number(*min)))),
        Check::Max(max) => as_number(value)
            .filter(|n| n > max)
            .and_then(|_| message(format!("Maximum value is {}", display_number(*max)))),
        Check::Integer => as_number(value)
            .filter(|n| n.fract() != 0.0)
            .and_then(|_| message("Value must be an integer".to_owned())),
        Check::Positive => as_number(value)
            .filter(|n| *n <= 0.0)
            .and_then(|_| message("Value must be positive".to_owned())),
        Check::Negative => as_number(value)
            .filter(|n| *n >= 0.0)
            .and_then(|_| message("Value must be negative".to_owned())),

        Check::DateMin(bound) => match coerce_date(value)? {
            Some(date) if date < coerce_bound(bound)? => {
                message(format!("Date must be after {}", display_param(bound)))
            }
            _ => None,
        },
        Check::DateMax(bound) => match coerce_date(value)? {
            Some(date) if date > coerce_bound(bound)? => {
                message(format!("Date must be before {}", display_param(bound)))
            }
            _ => None,
        },
        Check::DateFuture => match coerce_date(value)? {
            Some(date) if date <= now => message("Date must be in the future".to_owned()),
            _ => None,
        },
        Check::DatePast => match coerce_date(value)? {
            Some(date) if date >= now => message("Date must be in the past".to_owned()),
            _ => None,
        },

        Check::MinItems(min) => value
            .as_array()
            .filter(|items| items.len() < *min)
            .and_then(|_| message(format!("Minimum {min} items required"))),
        Check::MaxItems(max) => value
            .as_array()
            .filter(|items| items.len() > *max)
            .and_then(|_| message(format!("Maximum {max} items allowed"))),
        Check::UniqueItems => value
            .as_array()
            .filter(|items| has_duplicate_primitives(items))
            .and_then(|_| message("All items must be unique".to_owned())),

        Check::FieldMatch(field) => {
            if values_equal(value, sibling(context, field)) {
                None
            } else {
                message(format!("Value must match {field}"))
            }
        }
        Check::FieldCompare { field, operator } => {
            let other = sibling(context, field);
            if satisfies(value, other, *operator) {
                None
            } else {
                message(format!("Value must be {operator} {field}"))
            }
        }

        Check::Conditional { condition, rules } => {
            let values = context.map_or(&*EMPTY_VALUES, ValidationContext::values);
            if evaluate_condition(condition, values) {
                first_failure(rules, value, context, now)?
            } else {
                None
            }
        }

        Check::Custom | Check::Deferred { .. } => return Err(EvaluatorFault::MissingCheck),
    };

    Ok(outcome)
}

fn first_failure(
    rules: &[Rule],
    value: &Value,
    context: Option<&ValidationContext>,
    now: DateTime<Utc>,
) -> BuiltinResult {
    for nested in rules {
        if let Some(message) = evaluate_builtin(nested, value, context, now)? {
            return Ok(Some(message));
        }
    }
    Ok(None)
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn coerce_bound(bound: &Value) -> Result<DateTime<Utc>, EvaluatorFault> {
    coerce_date(bound)?.ok_or_else(|| EvaluatorFault::invalid_date(bound))
}

fn sibling<'a>(context: Option<&'a ValidationContext>, field: &str) -> &'a Value {
    context
        .and_then(|ctx| ctx.value(field))
        .unwrap_or(&Value::Null)
}

fn satisfies(value: &Value, other: &Value, operator: CompareOperator) -> bool {
    let Some(ordering) = compare_values(value, other) else {
        return false;
    };
    match operator {
        CompareOperator::Gt => ordering == Ordering::Greater,
        CompareOperator::Lt => ordering == Ordering::Less,
        CompareOperator::Ge => ordering != Ordering::Less,
        CompareOperator::Le => ordering != Ordering::Greater,
    }
}
