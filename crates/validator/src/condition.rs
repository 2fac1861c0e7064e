//! Boolean conditions evaluated against a snapshot of field values.
//!
//! This is the single condition evaluator in the crate. Conditional rules
//! ([`Check::Conditional`](crate::rule::Check::Conditional)) and field
//! visibility ([`VisibilityRule`](crate::visibility::VisibilityRule)) both
//! call [`evaluate_condition`], so the two can never disagree about what a
//! condition means.
//!
//! # Shapes
//!
//! | JSON | Meaning |
//! |---|---|
//! | `{"field": "f", "operator": ">", "value": 3}` | compare `values["f"]` with `3` |
//! | `{"and": [...]}` | every sub-condition holds |
//! | `{"or": [...]}` | at least one sub-condition holds |
//! | anything else, including `{}` | always true |
//!
//! A [`Predicate`] wraps a caller-supplied closure. It cannot be expressed in
//! JSON and refuses to serialize.
//!
//! # Examples
//!
//! ```rust
//! use fieldcheck::condition::{Condition, evaluate_condition};
//! use fieldcheck::value::FieldValues;
//! use serde_json::json;
//!
//! let condition = Condition::field("type").equals("business");
//!
//! let mut values = FieldValues::new();
//! values.insert("type".into(), json!("business"));
//! assert!(evaluate_condition(&condition, &values));
//!
//! values.insert("type".into(), json!("personal"));
//! assert!(!evaluate_condition(&condition, &values));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::de::Deserializer;
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{FieldValues, compare_values, values_equal};

// ============================================================================
// OPERATORS
// ============================================================================

/// Comparison operator inside a [`Condition::Compare`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    /// `=`
    #[default]
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `in`: the field value is a member of an array.
    In,
    /// An operator this evaluator does not know. Always evaluates to false.
    Unrecognized(String),
}

impl ConditionOperator {
    /// Parses an operator token. Unknown tokens are kept, not rejected.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "=" | "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "in" => Self::In,
            other => Self::Unrecognized(other.to_owned()),
        }
    }

    /// Token form of the operator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::In => "in",
            Self::Unrecognized(token) => token,
        }
    }

    /// Applies the operator to `actual` (the field value) and `expected`.
    #[must_use]
    pub fn apply(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => values_equal(actual, expected),
            Self::Ne => !values_equal(actual, expected),
            Self::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
            Self::Lt => compare_values(actual, expected) == Some(Ordering::Less),
            Self::Ge => matches!(
                compare_values(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Le => matches!(
                compare_values(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In => expected
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
            Self::Unrecognized(_) => false,
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PREDICATE
// ============================================================================

type PredicateFn = dyn Fn(&FieldValues) -> bool + Send + Sync;

/// A caller-supplied condition over the whole value snapshot.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValues) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the predicate.
    #[must_use]
    pub fn call(&self, values: &FieldValues) -> bool {
        (self.0)(values)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// CONDITION
// ============================================================================

/// A small boolean expression over named field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Condition {
    /// Compare one field against a literal.
    Compare {
        /// Field whose value is read from the snapshot.
        field: String,
        /// Operator, `=` when omitted.
        operator: ConditionOperator,
        /// Right-hand side of the comparison.
        value: Value,
    },
    /// All sub-conditions hold.
    And(Vec<Condition>),
    /// Any sub-condition holds.
    Or(Vec<Condition>),
    /// Caller-supplied closure.
    Predicate(Predicate),
    /// An empty or unrecognized shape. Always true.
    #[default]
    Always,
}

impl Condition {
    /// Starts a comparison on `field`.
    pub fn field(field: impl Into<String>) -> FieldConditionBuilder {
        FieldConditionBuilder {
            field: field.into(),
        }
    }

    /// Conjunction of `conditions`.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// Disjunction of `conditions`.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// Wraps a closure as a condition.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&FieldValues) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate::new(f))
    }

    /// Reads a condition from its JSON shape.
    ///
    /// Never fails: shapes that match nothing become [`Condition::Always`].
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Always;
        };

        if let Some(field) = object.get("field").and_then(Value::as_str)
            && !field.is_empty()
        {
            let operator = match object.get("operator") {
                None => ConditionOperator::Eq,
                Some(Value::String(token)) => ConditionOperator::parse(token),
                Some(other) => ConditionOperator::Unrecognized(other.to_string()),
            };
            return Self::Compare {
                field: field.to_owned(),
                operator,
                value: object.get("value").cloned().unwrap_or(Value::Null),
            };
        }
        if let Some(items) = object.get("and").and_then(Value::as_array) {
            return Self::And(items.iter().map(Self::from_value).collect());
        }
        if let Some(items) = object.get("or").and_then(Value::as_array) {
            return Self::Or(items.iter().map(Self::from_value).collect());
        }
        Self::Always
    }

    /// Field names this condition reads, in first-seen order.
    ///
    /// Predicates are opaque and contribute nothing.
    #[must_use]
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Self::And(items) | Self::Or(items) => {
                for item in items {
                    item.collect_fields(out);
                }
            }
            Self::Predicate(_) | Self::Always => {}
        }
    }

    /// Evaluates this condition. Same as [`evaluate_condition`].
    #[must_use]
    pub fn evaluate(&self, values: &FieldValues) -> bool {
        evaluate_condition(self, values)
    }
}

/// Builder returned by [`Condition::field`].
#[derive(Debug, Clone)]
pub struct FieldConditionBuilder {
    field: String,
}

impl FieldConditionBuilder {
    /// Compares with an explicit operator.
    pub fn op(self, operator: ConditionOperator, value: impl Into<Value>) -> Condition {
        Condition::Compare {
            field: self.field,
            operator,
            value: value.into(),
        }
    }

    /// `field = value`
    pub fn equals(self, value: impl Into<Value>) -> Condition {
        self.op(ConditionOperator::Eq, value)
    }

    /// `field != value`
    pub fn not_equals(self, value: impl Into<Value>) -> Condition {
        self.op(ConditionOperator::Ne, value)
    }

    /// `field > value`
    pub fn greater_than(self, value: impl Into<Value>) -> Condition {
        self.op(ConditionOperator::Gt, value)
    }

    /// `field < value`
    pub fn less_than(self, value: impl Into<Value>) -> Condition {
        self.op(ConditionOperator::Lt, value)
    }

    /// `field in values`
    pub fn one_of(self, values: impl IntoIterator<Item = Value>) -> Condition {
        self.op(
            ConditionOperator::In,
            Value::Array(values.into_iter().collect()),
        )
    }
}

/// Evaluates `condition` against `values`.
///
/// Missing fields read as `null`.
#[must_use]
pub fn evaluate_condition(condition: &Condition, values: &FieldValues) -> bool {
    match condition {
        Condition::Compare {
            field,
            operator,
            value,
        } => {
            let actual = values.get(field.as_str()).unwrap_or(&Value::Null);
            operator.apply(actual, value)
        }
        Condition::And(items) => items.iter().all(|c| evaluate_condition(c, values)),
        Condition::Or(items) => items.iter().any(|c| evaluate_condition(c, values)),
        Condition::Predicate(predicate) => predicate.call(values),
        Condition::Always => true,
    }
}

// ============================================================================
// SERDE
// ============================================================================

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Compare {
                field,
                operator,
                value,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("field", field)?;
                map.serialize_entry("operator", operator.as_str())?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::And(items) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("and", items)?;
                map.end()
            }
            Self::Or(items) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("or", items)?;
                map.end()
            }
            Self::Always => serializer.serialize_map(Some(0))?.end(),
            Self::Predicate(_) => Err(S::Error::custom(
                "predicate conditions cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn snapshot(value: Value) -> FieldValues {
        serde_json::from_value(value).unwrap()
    }

    #[rstest]
    #[case(json!("="), json!(5), true)]
    #[case(json!("!="), json!(5), false)]
    #[case(json!(">"), json!(4), true)]
    #[case(json!("<"), json!(4), false)]
    #[case(json!(">="), json!(5), true)]
    #[case(json!("<="), json!(5), true)]
    #[case(json!("in"), json!([1, 5, 9]), true)]
    #[case(json!("in"), json!(5), false)]
    #[case(json!("~"), json!(5), false)]
    #[case(json!(7), json!(5), false)]
    #[case(json!(null), json!(5), false)]
    fn comparison_operators(#[case] op: Value, #[case] rhs: Value, #[case] expected: bool) {
        let condition =
            Condition::from_value(&json!({"field": "n", "operator": op, "value": rhs}));
        assert_eq!(
            evaluate_condition(&condition, &snapshot(json!({"n": 5}))),
            expected
        );
    }

    #[test]
    fn operator_defaults_to_equality() {
        let condition = Condition::from_value(&json!({"field": "kind", "value": "a"}));
        assert_eq!(
            condition,
            Condition::Compare {
                field: "kind".into(),
                operator: ConditionOperator::Eq,
                value: json!("a"),
            }
        );
    }

    #[test]
    fn and_or_combine() {
        let values = snapshot(json!({"a": 1, "b": 2}));
        let both = Condition::all([
            Condition::field("a").equals(1),
            Condition::field("b").equals(2),
        ]);
        let either = Condition::any([
            Condition::field("a").equals(9),
            Condition::field("b").equals(2),
        ]);
        let neither = Condition::any([
            Condition::field("a").equals(9),
            Condition::field("b").equals(9),
        ]);
        assert!(both.evaluate(&values));
        assert!(either.evaluate(&values));
        assert!(!neither.evaluate(&values));
    }

    #[test]
    fn empty_combinators_follow_iterator_semantics() {
        let values = FieldValues::new();
        assert!(Condition::And(vec![]).evaluate(&values));
        assert!(!Condition::Or(vec![]).evaluate(&values));
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!(null))]
    #[case(json!("text"))]
    #[case(json!({"field": ""}))]
    #[case(json!({"and": "nope"}))]
    fn unknown_shapes_pass(#[case] raw: Value) {
        let condition = Condition::from_value(&raw);
        assert_eq!(condition, Condition::Always);
        assert!(condition.evaluate(&FieldValues::new()));
    }

    #[test]
    fn missing_field_reads_as_null() {
        let condition = Condition::field("gone").equals(Value::Null);
        assert!(condition.evaluate(&FieldValues::new()));
    }

    #[test]
    fn predicate_sees_whole_snapshot() {
        let condition = Condition::predicate(|values| values.len() == 2);
        assert!(condition.evaluate(&snapshot(json!({"a": 1, "b": 2}))));
        assert!(!condition.evaluate(&snapshot(json!({"a": 1}))));
    }

    #[test]
    fn referenced_fields_are_deduplicated() {
        let condition = Condition::all([
            Condition::field("a").equals(1),
            Condition::any([
                Condition::field("b").equals(1),
                Condition::field("a").equals(2),
            ]),
        ]);
        assert_eq!(condition.referenced_fields(), vec!["a", "b"]);
    }

    #[test]
    fn json_shape_is_stable() {
        let condition = Condition::all([Condition::field("type").equals("business")]);
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            json!({"and": [{"field": "type", "operator": "=", "value": "business"}]})
        );
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn predicates_refuse_to_serialize() {
        let condition = Condition::predicate(|_| true);
        assert!(serde_json::to_value(&condition).is_err());
    }
}
