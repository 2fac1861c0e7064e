//! Orchestration: one field against its schema, or many fields at once.
//!
//! ```rust
//! use fieldcheck::prelude::*;
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let engine = ValidationEngine::shared();
//! let schema = FieldSchema::new("age", [Rule::integer(), Rule::min(18.0)]);
//!
//! let result = engine.validate(&json!(16.5), &schema, None).await.unwrap();
//! assert!(!result.valid);
//! assert_eq!(result.errors.len(), 2);
//! # });
//! ```

use std::sync::{Arc, LazyLock};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::check::CheckRegistry;
use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, FaultPolicy};
use crate::context::ValidationContext;
use crate::error::{EVALUATOR_FAULT_CODE, EvaluatorFault};
use crate::evaluator::RuleEvaluator;
use crate::result::{FieldResults, UNKNOWN_FIELD, ValidationEntry, ValidationResult, is_valid};
use crate::rule::{Rule, Severity};
use crate::schema::{FieldSchema, Schemas};
use crate::value::FieldValues;

static SHARED: LazyLock<ValidationEngine> = LazyLock::new(ValidationEngine::default);

static NULL: Value = Value::Null;

/// Validates values against field schemas.
///
/// Holds no per-call state. Clones share the registry, clock and config.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    evaluator: RuleEvaluator,
    config: Arc<EngineConfig>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ValidationEngine {
    /// Engine with an empty registry, the system clock and default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ValidationEngineBuilder {
        ValidationEngineBuilder::default()
    }

    /// Process-wide engine with default settings and no custom checks.
    ///
    /// Built on first use and never mutated. Engines that need custom
    /// checks are built with [`ValidationEngine::builder`].
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// The rule evaluator, for callers running a single rule.
    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every rule of `schema` against `value`, in declaration order.
    ///
    /// All rules run; a failure never hides later ones. Entries land in
    /// `errors` or `warnings` by severity, keeping declaration order.
    ///
    /// Returns `Err` only under [`FaultPolicy::Propagate`].
    #[instrument(
        level = "debug",
        skip_all,
        fields(field = schema.field.as_deref().unwrap_or(UNKNOWN_FIELD), rules = schema.rules.len())
    )]
    pub async fn validate(
        &self,
        value: &Value,
        schema: &FieldSchema,
        context: Option<&ValidationContext>,
    ) -> Result<ValidationResult, EvaluatorFault> {
        let field = schema.field.as_deref().unwrap_or(UNKNOWN_FIELD);
        self.run_rules(field, value, &schema.rules, context).await
    }

    /// Validates every field in `schemas` against one shared snapshot of
    /// `values`.
    ///
    /// Fields run concurrently, at most `max_concurrent_fields` at a time.
    /// The result has exactly one entry per schema, in schema order. A
    /// value missing from `values` is validated as `null`, and a schema
    /// without a `field` name reports under its map key.
    #[instrument(level = "debug", skip_all, fields(fields = schemas.len()))]
    pub async fn validate_fields(
        &self,
        values: &FieldValues,
        schemas: &Schemas,
    ) -> Result<FieldResults, EvaluatorFault> {
        let context = ValidationContext::new(values.clone());
        let context = &context;

        let results: FieldResults = stream::iter(schemas)
            .map(|(key, schema)| async move {
                let field = schema.field.as_deref().unwrap_or(key);
                let value = values.get(key).unwrap_or(&NULL);
                let result = self.run_rules(field, value, &schema.rules, Some(context)).await?;
                Ok::<_, EvaluatorFault>((key.clone(), result))
            })
            .buffered(self.config.max_concurrent_fields)
            .try_collect()
            .await?;

        debug!(
            valid = is_valid(&results),
            "validated {} fields",
            results.len()
        );
        Ok(results)
    }

    async fn run_rules(
        &self,
        field: &str,
        value: &Value,
        rules: &[Rule],
        context: Option<&ValidationContext>,
    ) -> Result<ValidationResult, EvaluatorFault> {
        let mut result = ValidationResult::valid();

        for rule in rules {
            match self.evaluator.evaluate_rule(value, rule, context).await {
                Ok(None) => {}
                Ok(Some(message)) => {
                    result.push(ValidationEntry::new(field, rule.kind(), message, rule.severity));
                }
                Err(fault) => match self.config.fault_policy {
                    FaultPolicy::Propagate => {
                        warn!(field, kind = %rule.kind(), error = %fault, "rule faulted, aborting");
                        return Err(fault);
                    }
                    FaultPolicy::Isolate => {
                        warn!(field, kind = %rule.kind(), error = %fault, "rule faulted");
                        result.push(
                            ValidationEntry::new(field, rule.kind(), fault.to_string(), Severity::Error)
                                .with_code(EVALUATOR_FAULT_CODE),
                        );
                    }
                },
            }
        }

        debug!(
            field,
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "field validated"
        );
        Ok(result)
    }
}

/// Builder for [`ValidationEngine`].
#[derive(Debug, Default)]
pub struct ValidationEngineBuilder {
    registry: Option<Arc<CheckRegistry>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<EngineConfig>,
}

impl ValidationEngineBuilder {
    /// Custom checks available to rules.
    #[must_use = "builder methods must be chained or built"]
    pub fn registry(mut self, registry: impl Into<Arc<CheckRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Clock used by `date_future` and `date_past`.
    #[must_use = "builder methods must be chained or built"]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn build(self) -> ValidationEngine {
        let config = self.config.unwrap_or_default();
        let registry = self.registry.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        debug!(
            checks = registry.len(),
            fault_policy = ?config.fault_policy,
            "building validation engine"
        );
        ValidationEngine {
            evaluator: RuleEvaluator::new(registry, clock, config.fallback_message.as_str()),
            config: Arc::new(config),
        }
    }
}
