//! Single-rule evaluation.
//!
//! Resolution order for one rule:
//!
//! 1. `async_custom_check`, awaited;
//! 2. `custom_check`;
//! 3. the built-in behavior for the rule's kind.
//!
//! A custom check that fails without a message reports the rule's message,
//! or the configured fallback.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::catalog::evaluate_builtin;
use crate::check::{CheckId, CheckRegistry, CheckResult};
use crate::clock::Clock;
use crate::context::ValidationContext;
use crate::error::EvaluatorFault;
use crate::rule::Rule;

/// Evaluates individual rules against a registry and a clock.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    registry: Arc<CheckRegistry>,
    clock: Arc<dyn Clock>,
    fallback_message: Arc<str>,
}

impl RuleEvaluator {
    pub fn new(
        registry: Arc<CheckRegistry>,
        clock: Arc<dyn Clock>,
        fallback_message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            registry,
            clock,
            fallback_message: fallback_message.into(),
        }
    }

    /// Runs `rule` against `value`.
    ///
    /// `Ok(None)` means the rule passed; `Ok(Some(message))` that it failed.
    pub async fn evaluate_rule(
        &self,
        value: &Value,
        rule: &Rule,
        context: Option<&ValidationContext>,
    ) -> Result<Option<String>, EvaluatorFault> {
        if let Some(id) = &rule.async_custom_check {
            trace!(check = %id, kind = %rule.kind(), "running async custom check");
            let check = self
                .registry
                .async_check(id)
                .ok_or_else(|| EvaluatorFault::UnknownCheck(id.clone()))?;
            let result = check.check(value, context).await;
            return self.outcome(id, rule, result);
        }

        if let Some(id) = &rule.custom_check {
            trace!(check = %id, kind = %rule.kind(), "running custom check");
            let check = self
                .registry
                .sync_check(id)
                .ok_or_else(|| EvaluatorFault::UnknownCheck(id.clone()))?;
            let result = check.check(value, context);
            return self.outcome(id, rule, result);
        }

        evaluate_builtin(rule, value, context, self.clock.now())
    }

    fn outcome(
        &self,
        id: &CheckId,
        rule: &Rule,
        result: CheckResult,
    ) -> Result<Option<String>, EvaluatorFault> {
        let outcome = result.map_err(|source| EvaluatorFault::CheckFailed {
            check: id.clone(),
            source,
        })?;
        Ok(outcome.into_message(rule.message.as_deref(), &self.fallback_message))
    }
}
