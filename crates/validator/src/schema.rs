//! Per-field schemas: an ordered rule list plus advisory metadata.
//!
//! ```rust
//! use fieldcheck::schema::FieldSchema;
//! use serde_json::json;
//!
//! let schema: FieldSchema = serde_json::from_value(json!({
//!     "field": "confirm",
//!     "rules": [
//!         {"kind": "required"},
//!         {"kind": "field_match", "params": "password", "message": "Passwords differ"}
//!     ],
//!     "triggers": ["blur", "submit"]
//! }))
//! .unwrap();
//!
//! assert_eq!(schema.dependencies(), vec!["password"]);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::rule::{Check, Rule};

/// Moment at which a caller may choose to run validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Every value change.
    Change,
    /// Focus leaves the field.
    Blur,
    /// The form is submitted.
    Submit,
}

/// Rules and metadata for one validatable field.
///
/// `triggers`, `is_async` and `debounce_ms` are hints for the caller's
/// scheduling; the engine does not act on them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name used in entries. Falls back to `"unknown"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Rules, evaluated in this order.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// When the caller should validate. Empty means always.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    /// Whether any rule needs to wait on I/O.
    #[serde(default, rename = "async")]
    pub is_async: bool,
    /// Suggested debounce for change-triggered validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl FieldSchema {
    /// Schema for `field` with the given rules.
    pub fn new(field: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            field: Some(field.into()),
            rules: rules.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Schema with no field name.
    pub fn anonymous(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Appends a rule.
    #[must_use = "builder methods must be chained or built"]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Restricts the triggers.
    #[must_use = "builder methods must be chained or built"]
    pub fn triggers(mut self, triggers: impl IntoIterator<Item = Trigger>) -> Self {
        self.triggers = triggers.into_iter().collect();
        self
    }

    /// Marks the schema as asynchronous with an optional debounce.
    #[must_use = "builder methods must be chained or built"]
    pub fn asynchronous(mut self, debounce_ms: Option<u64>) -> Self {
        self.is_async = true;
        self.debounce_ms = debounce_ms;
        self
    }

    /// Whether the caller should validate on `trigger`.
    #[must_use]
    pub fn applies_to(&self, trigger: Trigger) -> bool {
        self.triggers.is_empty() || self.triggers.contains(&trigger)
    }

    /// Whether any rule carries an async custom check.
    #[must_use]
    pub fn has_async_rules(&self) -> bool {
        self.rules.iter().any(|r| r.async_custom_check.is_some())
    }

    /// Other fields read by this schema's rules, in first-seen order.
    ///
    /// Collected from `depends_on`, `field_match`, `field_compare` and the
    /// conditions of `conditional` rules (including their nested rules).
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for rule in &self.rules {
            collect_rule_dependencies(rule, &mut out);
        }
        if let Some(own) = self.field.as_deref() {
            out.retain(|f| *f != own);
        }
        out
    }

    /// Parses a schema from JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }
}

fn collect_rule_dependencies<'a>(rule: &'a Rule, out: &mut Vec<&'a str>) {
    let mut push = |field: &'a str| {
        if !out.contains(&field) {
            out.push(field);
        }
    };
    for field in &rule.depends_on {
        push(field);
    }
    match &rule.check {
        Check::FieldMatch(field) | Check::FieldCompare { field, .. } => push(field),
        Check::Conditional { condition, rules } => {
            for field in condition.referenced_fields() {
                push(field);
            }
            for nested in rules {
                collect_rule_dependencies(nested, out);
            }
        }
        _ => {}
    }
}

/// Schemas keyed by field name, in declaration order.
pub type Schemas = IndexMap<String, FieldSchema>;

/// Fields whose schemas depend on `field`, in declaration order.
///
/// A caller that just changed `field` revalidates these as well.
#[must_use]
pub fn dependents_of<'a>(schemas: &'a Schemas, field: &str) -> Vec<&'a str> {
    schemas
        .iter()
        .filter(|(name, schema)| name.as_str() != field && schema.dependencies().contains(&field))
        .map(|(name, _)| name.as_str())
        .collect()
}
