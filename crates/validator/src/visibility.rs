//! Field visibility driven by the same conditions conditional rules use.

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, evaluate_condition};
use crate::schema::Schemas;
use crate::value::FieldValues;

/// Shows `field` only while `show_when` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRule {
    pub field: String,
    #[serde(default)]
    pub show_when: Condition,
}

impl VisibilityRule {
    pub fn new(field: impl Into<String>, show_when: Condition) -> Self {
        Self {
            field: field.into(),
            show_when,
        }
    }

    /// Whether the field is shown for `values`.
    #[must_use]
    pub fn is_visible(&self, values: &FieldValues) -> bool {
        evaluate_condition(&self.show_when, values)
    }
}

/// Names from `fields` that are visible for `values`, in input order.
///
/// A field without a rule is always visible. When several rules name the
/// same field, all of them must hold.
pub fn visible_fields<'a, I>(fields: I, rules: &[VisibilityRule], values: &FieldValues) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .filter(|field| {
            rules
                .iter()
                .filter(|rule| rule.field == *field)
                .all(|rule| rule.is_visible(values))
        })
        .collect()
}

/// Copy of `schemas` without the fields hidden for `values`.
///
/// Hidden fields are typically skipped by
/// [`ValidationEngine::validate_fields`](crate::engine::ValidationEngine::validate_fields).
#[must_use]
pub fn visible_schemas(schemas: &Schemas, rules: &[VisibilityRule], values: &FieldValues) -> Schemas {
    let visible = visible_fields(schemas.keys().map(String::as_str), rules, values);
    schemas
        .iter()
        .filter(|(name, _)| visible.contains(&name.as_str()))
        .map(|(name, schema)| (name.clone(), schema.clone()))
        .collect()
}
