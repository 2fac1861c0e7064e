//! Read-only snapshot shared by every rule in one validation call.
//!
//! A [`ValidationContext`] is the only way a rule sees values other than its
//! own. It is built once, before any field is evaluated, and never mutated:
//! results computed for one field are not fed back in before the next field
//! runs. Clones share the underlying data.

use std::sync::Arc;

use serde_json::Value;

use crate::value::FieldValues;

/// Snapshot of sibling values plus optional caller metadata.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    values: Arc<FieldValues>,
    field_metadata: Option<Arc<Value>>,
    parent: Option<Arc<Value>>,
    user: Option<Arc<Value>>,
}

impl ValidationContext {
    /// Context holding only a value snapshot.
    #[must_use]
    pub fn new(values: FieldValues) -> Self {
        Self {
            values: Arc::new(values),
            ..Self::default()
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ValidationContextBuilder {
        ValidationContextBuilder::default()
    }

    /// All field values.
    #[must_use]
    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Value of `field`, if present in the snapshot.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Metadata describing the fields, as supplied by the caller.
    #[must_use]
    pub fn field_metadata(&self) -> Option<&Value> {
        self.field_metadata.as_deref()
    }

    /// The record that owns these fields, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_deref()
    }

    /// Information about the acting user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&Value> {
        self.user.as_deref()
    }
}

impl From<FieldValues> for ValidationContext {
    fn from(values: FieldValues) -> Self {
        Self::new(values)
    }
}

/// Builder for [`ValidationContext`].
#[derive(Debug, Default)]
pub struct ValidationContextBuilder {
    values: FieldValues,
    field_metadata: Option<Value>,
    parent: Option<Value>,
    user: Option<Value>,
}

impl ValidationContextBuilder {
    /// Adds one field value.
    #[must_use = "builder methods must be chained or built"]
    pub fn value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Replaces the whole value snapshot.
    #[must_use = "builder methods must be chained or built"]
    pub fn values(mut self, values: FieldValues) -> Self {
        self.values = values;
        self
    }

    /// Attaches field metadata.
    #[must_use = "builder methods must be chained or built"]
    pub fn field_metadata(mut self, metadata: Value) -> Self {
        self.field_metadata = Some(metadata);
        self
    }

    /// Attaches the parent record.
    #[must_use = "builder methods must be chained or built"]
    pub fn parent(mut self, parent: Value) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attaches user information.
    #[must_use = "builder methods must be chained or built"]
    pub fn user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    /// Freezes the context.
    #[must_use]
    pub fn build(self) -> ValidationContext {
        ValidationContext {
            values: Arc::new(self.values),
            field_metadata: self.field_metadata.map(Arc::new),
            parent: self.parent.map(Arc::new),
            user: self.user.map(Arc::new),
        }
    }
}
