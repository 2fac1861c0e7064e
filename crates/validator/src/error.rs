//! Error types for the validation engine.
//!
//! Two categories are kept apart on purpose:
//!
//! - **Validation failures** are data. They surface as
//!   [`ValidationEntry`](crate::result::ValidationEntry) values inside a
//!   [`ValidationResult`](crate::result::ValidationResult) and never as an `Err`.
//! - **Evaluator faults** ([`EvaluatorFault`]) are unexpected conditions hit
//!   while evaluating a rule: a check that is not registered, a check that
//!   errored, a date that cannot be coerced.
//!
//! Schema loading has its own error type, [`SchemaError`], raised when rule
//! data cannot be turned into typed rules.

use std::borrow::Cow;

use thiserror::Error;

use crate::check::CheckId;

/// Code used for entries synthesized from an isolated [`EvaluatorFault`].
pub const EVALUATOR_FAULT_CODE: &str = "evaluator_fault";

/// An unexpected failure while evaluating a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorFault {
    /// The rule references a check id that is not in the registry.
    #[error("check `{0}` is not registered")]
    UnknownCheck(CheckId),

    /// A custom check returned an error instead of an outcome.
    #[error("check `{check}` failed: {source}")]
    CheckFailed {
        /// Id of the failing check.
        check: CheckId,
        /// Error reported by the check.
        #[source]
        source: CheckError,
    },

    /// A rule with no built-in behavior (kind `custom`, or params left
    /// unparsed for a custom check) reached evaluation without its check.
    #[error("rule has no built-in behavior and no check attached")]
    MissingCheck,

    /// A date-like value or bound could not be coerced into a timestamp.
    #[error("cannot interpret {value} as a date")]
    InvalidDate {
        /// The offending value, rendered as JSON.
        value: String,
    },
}

impl EvaluatorFault {
    /// Creates an [`EvaluatorFault::InvalidDate`] for the given value.
    pub(crate) fn invalid_date(value: &serde_json::Value) -> Self {
        Self::InvalidDate {
            value: value.to_string(),
        }
    }
}

/// Error reported by a [`CustomCheck`](crate::check::CustomCheck) or
/// [`AsyncCustomCheck`](crate::check::AsyncCustomCheck).
///
/// Checks return this when they cannot produce an outcome at all (for example
/// a remote lookup that failed). It is converted into an [`EvaluatorFault`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CheckError {
    message: Cow<'static, str>,
}

impl CheckError {
    /// Creates a new check error.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while loading rule and schema data.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The `kind` string is not part of the rule catalog.
    #[error("unknown rule kind `{0}`")]
    UnknownKind(String),

    /// The rule kind needs `params` but none were given.
    #[error("rule `{kind}` requires params")]
    MissingParams {
        /// Rule kind that was missing its params.
        kind: &'static str,
    },

    /// The `params` value has the wrong shape for the rule kind.
    #[error("invalid params for rule `{kind}`: {reason}")]
    InvalidParams {
        /// Rule kind whose params were rejected.
        kind: &'static str,
        /// Why the params were rejected.
        reason: String,
    },

    /// A `pattern` rule carries a regex that does not compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Underlying JSON decoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn invalid_params(kind: &'static str, reason: impl ToString) -> Self {
        Self::InvalidParams {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override holds a value of the wrong shape.
    #[error("invalid value `{value}` for environment variable `{key}`")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}
