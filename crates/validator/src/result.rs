//! Validation results and aggregation over many fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::{RuleKind, Severity};

/// Field name used when a schema does not name its field.
pub const UNKNOWN_FIELD: &str = "unknown";

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    /// Field the rule belongs to.
    pub field: String,
    /// Message to show next to the field.
    pub message: String,
    /// Machine-readable code; the rule kind, or `evaluator_fault`.
    pub code: String,
    /// Kind of the rule that produced this entry.
    pub rule: String,
    /// Classification of the failure.
    pub severity: Severity,
    /// Extra data for the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ValidationEntry {
    /// Entry for a failed rule of `kind`.
    pub fn new(
        field: impl Into<String>,
        kind: RuleKind,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: kind.as_str().to_owned(),
            rule: kind.as_str().to_owned(),
            severity,
            context: None,
        }
    }

    /// Overrides the code.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attaches renderer context.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Outcome of validating one field.
///
/// `valid` is kept equal to `errors.is_empty()`; warnings never affect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether no blocking entry was produced.
    pub valid: bool,
    /// Blocking entries, in rule declaration order.
    pub errors: Vec<ValidationEntry>,
    /// Advisory entries (`warning` and non-blocking `info`), in rule
    /// declaration order.
    pub warnings: Vec<ValidationEntry>,
}

impl ValidationResult {
    /// A passing result with no entries.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Routes `entry` by its severity: `error` into `errors`, `warning` and
    /// `info` into `warnings`.
    pub fn push(&mut self, entry: ValidationEntry) {
        if entry.severity.is_blocking() {
            self.errors.push(entry);
        } else {
            self.warnings.push(entry);
        }
        self.valid = self.errors.is_empty();
    }

    /// Whether there are any entries at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// First error message, if any. Handy for single-line renderers.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl FromIterator<ValidationEntry> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationEntry>>(iter: I) -> Self {
        let mut result = Self::valid();
        for entry in iter {
            result.push(entry);
        }
        result
    }
}

/// Per-field results, in schema declaration order.
pub type FieldResults = IndexMap<String, ValidationResult>;

/// Whether every field is valid.
#[must_use]
pub fn is_valid(results: &FieldResults) -> bool {
    results.values().all(|r| r.valid)
}

/// All errors, field by field.
#[must_use]
pub fn all_errors(results: &FieldResults) -> Vec<&ValidationEntry> {
    results.values().flat_map(|r| &r.errors).collect()
}

/// All warnings, field by field.
#[must_use]
pub fn all_warnings(results: &FieldResults) -> Vec<&ValidationEntry> {
    results.values().flat_map(|r| &r.warnings).collect()
}
