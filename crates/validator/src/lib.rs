//! # fieldcheck
//!
//! A declarative rule engine for validating form fields.
//!
//! A field is described by a [`FieldSchema`]: an ordered list of [`Rule`]s,
//! each naming a built-in kind (`required`, `min_length`, `email`,
//! `field_match`, `conditional`, ...) plus an optional message and severity.
//! The [`ValidationEngine`] runs every rule and returns a
//! [`ValidationResult`] split into blocking errors and advisory warnings.
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldcheck::prelude::*;
//! use serde_json::json;
//!
//! let schemas: Schemas = serde_json::from_value(json!({
//!     "password": {"rules": [{"kind": "min_length", "params": 8}]},
//!     "confirm": {"rules": [{"kind": "field_match", "params": "password"}]},
//! }))
//! .unwrap();
//!
//! let values: FieldValues = serde_json::from_value(json!({
//!     "password": "hunter22",
//!     "confirm": "hunter2",
//! }))
//! .unwrap();
//!
//! let results = futures::executor::block_on(
//!     ValidationEngine::shared().validate_fields(&values, &schemas),
//! )
//! .unwrap();
//!
//! assert!(!is_valid(&results));
//! assert_eq!(all_errors(&results)[0].message, "Value must match password");
//! ```
//!
//! ## Custom Checks
//!
//! Rules reference caller logic by id through `custom_check` and
//! `async_custom_check`. Checks are registered once in a
//! [`CheckRegistry`](check::CheckRegistry) and handed to
//! [`ValidationEngine::builder`].
//!
//! ## Faults
//!
//! A rule that cannot decide (unregistered check, failing check, value that
//! cannot be read as a date) raises an [`EvaluatorFault`]. By default the
//! engine records it as an `error` entry with code `evaluator_fault`; with
//! [`FaultPolicy::Propagate`](config::FaultPolicy::Propagate) it aborts the
//! call instead.

pub mod catalog;
pub mod check;
pub mod clock;
pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod prelude;
pub mod result;
pub mod rule;
pub mod schema;
pub mod value;
pub mod visibility;

pub use context::ValidationContext;
pub use engine::ValidationEngine;
pub use error::{EvaluatorFault, SchemaError};
pub use result::{FieldResults, ValidationEntry, ValidationResult};
pub use rule::{Rule, RuleKind, Severity};
pub use schema::FieldSchema;
