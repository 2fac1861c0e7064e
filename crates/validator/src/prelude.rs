//! Prelude module for convenient imports.
//!
//! ```rust
//! use fieldcheck::prelude::*;
//!
//! let schema = FieldSchema::new("email", [Rule::required(), Rule::email()]);
//! assert_eq!(schema.rules[1].kind(), RuleKind::Email);
//! ```

// ============================================================================
// SCHEMA: rules, kinds and per-field schemas
// ============================================================================

pub use crate::rule::{Check, CompareOperator, Pattern, Rule, RuleKind, Severity};
pub use crate::schema::{FieldSchema, Schemas, Trigger, dependents_of};

// ============================================================================
// CONDITIONS AND VISIBILITY
// ============================================================================

pub use crate::condition::{Condition, ConditionOperator, evaluate_condition};
pub use crate::visibility::{VisibilityRule, visible_fields, visible_schemas};

// ============================================================================
// ENGINE: evaluation, checks, configuration
// ============================================================================

pub use crate::check::{
    AsyncCustomCheck, AsyncFnCheck, CheckId, CheckOutcome, CheckRegistry, CheckResult,
    CustomCheck, TimeoutCheck,
};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{EngineConfig, FaultPolicy};
pub use crate::context::ValidationContext;
pub use crate::engine::{ValidationEngine, ValidationEngineBuilder};
pub use crate::evaluator::RuleEvaluator;

// ============================================================================
// RESULTS AND ERRORS
// ============================================================================

pub use crate::error::{CheckError, ConfigError, EvaluatorFault, SchemaError};
pub use crate::result::{
    FieldResults, ValidationEntry, ValidationResult, all_errors, all_warnings, is_valid,
};
pub use crate::value::FieldValues;
