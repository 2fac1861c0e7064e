//! Custom checks: caller-supplied rule logic resolved by id.
//!
//! Rules never embed callables. A rule names a check by [`CheckId`] in its
//! `custom_check` or `async_custom_check` field, and the engine resolves that
//! id through a [`CheckRegistry`] built once by the caller. Schemas therefore
//! stay plain data that can be logged, diffed and shipped over the wire.
//!
//! ```rust
//! use fieldcheck::check::{CheckOutcome, CheckRegistry, CheckResult};
//! use fieldcheck::ValidationContext;
//! use serde_json::Value;
//!
//! let registry = CheckRegistry::builder()
//!     .check("no_admin", |value: &Value, _ctx: Option<&ValidationContext>| -> CheckResult {
//!         Ok(CheckOutcome::from(value.as_str() != Some("admin")))
//!     })
//!     .build();
//!
//! assert!(registry.sync_check(&"no_admin".into()).is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::ValidationContext;
use crate::error::CheckError;

// ============================================================================
// IDS AND OUTCOMES
// ============================================================================

/// Name under which a custom check is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckId(String);

impl CheckId {
    /// Creates a check id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CheckId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CheckId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a custom check decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The value is acceptable.
    Pass,
    /// The value is rejected; the rule's message (or a fallback) is used.
    Fail,
    /// The value is rejected with this exact message.
    FailWith(String),
}

impl CheckOutcome {
    /// Message to report, if the outcome is a failure.
    ///
    /// `rule_message` is used for [`CheckOutcome::Fail`], falling back to
    /// `fallback` when the rule has no message of its own.
    #[must_use]
    pub fn into_message(self, rule_message: Option<&str>, fallback: &str) -> Option<String> {
        match self {
            Self::Pass => None,
            Self::Fail => Some(rule_message.unwrap_or(fallback).to_owned()),
            Self::FailWith(message) => Some(message),
        }
    }
}

impl From<bool> for CheckOutcome {
    fn from(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

impl From<String> for CheckOutcome {
    fn from(message: String) -> Self {
        Self::FailWith(message)
    }
}

impl From<&str> for CheckOutcome {
    fn from(message: &str) -> Self {
        Self::FailWith(message.to_owned())
    }
}

impl From<Option<String>> for CheckOutcome {
    fn from(message: Option<String>) -> Self {
        message.map_or(Self::Pass, Self::FailWith)
    }
}

/// Result type returned by checks.
pub type CheckResult = Result<CheckOutcome, CheckError>;

// ============================================================================
// CHECK TRAITS
// ============================================================================

/// A synchronous custom check.
///
/// Implemented for any `Fn(&Value, Option<&ValidationContext>) -> CheckResult`.
pub trait CustomCheck: Send + Sync {
    /// Evaluates `value`, optionally looking at sibling values in `context`.
    fn check(&self, value: &Value, context: Option<&ValidationContext>) -> CheckResult;
}

impl<F> CustomCheck for F
where
    F: Fn(&Value, Option<&ValidationContext>) -> CheckResult + Send + Sync,
{
    fn check(&self, value: &Value, context: Option<&ValidationContext>) -> CheckResult {
        self(value, context)
    }
}

/// An asynchronous custom check, for lookups that must wait on I/O.
#[async_trait]
pub trait AsyncCustomCheck: Send + Sync {
    /// Evaluates `value`, optionally looking at sibling values in `context`.
    async fn check(&self, value: &Value, context: Option<&ValidationContext>) -> CheckResult;
}

/// Adapts an async closure over owned inputs into an [`AsyncCustomCheck`].
///
/// The value and context are cloned per call; contexts share their snapshot
/// through an `Arc`, so this is cheap.
pub struct AsyncFnCheck<F>(F);

impl<F, Fut> AsyncFnCheck<F>
where
    F: Fn(Value, Option<ValidationContext>) -> Fut + Send + Sync,
    Fut: Future<Output = CheckResult> + Send,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> AsyncCustomCheck for AsyncFnCheck<F>
where
    F: Fn(Value, Option<ValidationContext>) -> Fut + Send + Sync,
    Fut: Future<Output = CheckResult> + Send,
{
    async fn check(&self, value: &Value, context: Option<&ValidationContext>) -> CheckResult {
        (self.0)(value.clone(), context.cloned()).await
    }
}

/// Bounds an async check with a deadline.
///
/// The engine never times checks out on its own. Callers that need a bound
/// wrap the check before registering it. An expired deadline is reported as a
/// failed validation, not as a fault.
pub struct TimeoutCheck<C> {
    inner: C,
    timeout: Duration,
}

impl<C: AsyncCustomCheck> TimeoutCheck<C> {
    /// Wraps `inner` with `timeout`.
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<C: AsyncCustomCheck> AsyncCustomCheck for TimeoutCheck<C> {
    async fn check(&self, value: &Value, context: Option<&ValidationContext>) -> CheckResult {
        match tokio::time::timeout(self.timeout, self.inner.check(value, context)).await {
            Ok(result) => result,
            Err(_) => Ok(CheckOutcome::FailWith(format!(
                "Validation timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Immutable table of custom checks, keyed by [`CheckId`].
#[derive(Default, Clone)]
pub struct CheckRegistry {
    sync_checks: HashMap<CheckId, Arc<dyn CustomCheck>>,
    async_checks: HashMap<CheckId, Arc<dyn AsyncCustomCheck>>,
}

impl CheckRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> CheckRegistryBuilder {
        CheckRegistryBuilder::default()
    }

    /// Looks up a synchronous check.
    #[must_use]
    pub fn sync_check(&self, id: &CheckId) -> Option<&Arc<dyn CustomCheck>> {
        self.sync_checks.get(id)
    }

    /// Looks up an asynchronous check.
    #[must_use]
    pub fn async_check(&self, id: &CheckId) -> Option<&Arc<dyn AsyncCustomCheck>> {
        self.async_checks.get(id)
    }

    /// Total number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sync_checks.len() + self.async_checks.len()
    }

    /// Whether no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sync: Vec<_> = self.sync_checks.keys().map(CheckId::as_str).collect();
        let mut asynchronous: Vec<_> = self.async_checks.keys().map(CheckId::as_str).collect();
        sync.sort_unstable();
        asynchronous.sort_unstable();
        f.debug_struct("CheckRegistry")
            .field("sync_checks", &sync)
            .field("async_checks", &asynchronous)
            .finish()
    }
}

/// Builder for [`CheckRegistry`]. Registering an id twice replaces the
/// earlier check.
#[derive(Default)]
pub struct CheckRegistryBuilder {
    registry: CheckRegistry,
}

impl CheckRegistryBuilder {
    /// Registers a synchronous check.
    #[must_use = "builder methods must be chained or built"]
    pub fn check<C>(mut self, id: impl Into<CheckId>, check: C) -> Self
    where
        C: CustomCheck + 'static,
    {
        let id = id.into();
        debug!(check = %id, "registering sync check");
        self.registry.sync_checks.insert(id, Arc::new(check));
        self
    }

    /// Registers an asynchronous check.
    #[must_use = "builder methods must be chained or built"]
    pub fn async_check<C>(mut self, id: impl Into<CheckId>, check: C) -> Self
    where
        C: AsyncCustomCheck + 'static,
    {
        let id = id.into();
        debug!(check = %id, "registering async check");
        self.registry.async_checks.insert(id, Arc::new(check));
        self
    }

    /// Registers an async closure over owned inputs.
    #[must_use = "builder methods must be chained or built"]
    pub fn async_fn<F, Fut>(self, id: impl Into<CheckId>, f: F) -> Self
    where
        F: Fn(Value, Option<ValidationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckResult> + Send + 'static,
    {
        self.async_check(id, AsyncFnCheck::new(f))
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> CheckRegistry {
        self.registry
    }
}
