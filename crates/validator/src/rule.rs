//! Declarative rules and their typed parameters.
//!
//! On the wire a rule is the JSON object
//!
//! ```json
//! { "kind": "min_length", "params": 3, "message": "Too short", "severity": "warning" }
//! ```
//!
//! `kind` is drawn from the closed [`RuleKind`] catalog; an unknown kind is a
//! [`SchemaError`] at load time rather than a rule that silently passes.
//! `params` are parsed into a typed [`Check`] while loading, so a malformed
//! regex or a non-numeric bound is reported once, up front.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::check::CheckId;
use crate::condition::Condition;
use crate::error::SchemaError;

// ============================================================================
// SEVERITY
// ============================================================================

/// How a failed rule is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks validity.
    #[default]
    Error,
    /// Reported, never blocks validity.
    Warning,
    /// Advisory; routed to `warnings` and never blocks validity.
    Info,
}

impl Severity {
    /// Whether a failure at this severity makes the result invalid.
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RULE KIND
// ============================================================================

macro_rules! rule_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// The closed catalog of rule kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RuleKind {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl RuleKind {
            /// Every kind, in catalog order.
            pub const ALL: &[RuleKind] = &[$(RuleKind::$variant),+];

            /// Wire name, also used as the entry `code`.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(RuleKind::$variant => $name,)+
                }
            }
        }

        impl FromStr for RuleKind {
            type Err = SchemaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(RuleKind::$variant),)+
                    other => Err(SchemaError::UnknownKind(other.to_owned())),
                }
            }
        }
    };
}

rule_kinds! {
    Required => "required",
    MinLength => "min_length",
    MaxLength => "max_length",
    Pattern => "pattern",
    Email => "email",
    Url => "url",
    Phone => "phone",
    Min => "min",
    Max => "max",
    Integer => "integer",
    Positive => "positive",
    Negative => "negative",
    DateMin => "date_min",
    DateMax => "date_max",
    DateFuture => "date_future",
    DatePast => "date_past",
    MinItems => "min_items",
    MaxItems => "max_items",
    UniqueItems => "unique_items",
    FieldMatch => "field_match",
    FieldCompare => "field_compare",
    Conditional => "conditional",
    Custom => "custom",
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TYPED PARAMS
// ============================================================================

/// A compiled regular expression that compares by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles `source`.
    pub fn new(source: &str) -> Result<Self, SchemaError> {
        Ok(Self(Regex::new(source)?))
    }

    /// Whether `haystack` contains a match.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }

    /// Source text of the expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Self(regex)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Operator accepted by `field_compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl CompareOperator {
    /// Token form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

impl FromStr for CompareOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Ge),
            "<=" => Ok(Self::Le),
            other => Err(format!("unsupported operator `{other}`")),
        }
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule kind together with its parsed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Value must not be null or `""`.
    Required,
    /// String length lower bound, in characters.
    MinLength(usize),
    /// String length upper bound, in characters.
    MaxLength(usize),
    /// String must match the expression.
    Pattern(Pattern),
    /// String must look like `local@domain.tld`.
    Email,
    /// String must parse as an absolute URL.
    Url,
    /// String may only hold digits, spaces and `-+()`.
    Phone,
    /// Number lower bound.
    Min(f64),
    /// Number upper bound.
    Max(f64),
    /// Number must be whole.
    Integer,
    /// Number must be greater than zero.
    Positive,
    /// Number must be less than zero.
    Negative,
    /// Date must not be before the bound.
    DateMin(Value),
    /// Date must not be after the bound.
    DateMax(Value),
    /// Date must be after the evaluation-time clock.
    DateFuture,
    /// Date must be before the evaluation-time clock.
    DatePast,
    /// Array length lower bound.
    MinItems(usize),
    /// Array length upper bound.
    MaxItems(usize),
    /// Array must not repeat a primitive item.
    UniqueItems,
    /// Value must equal another field's value.
    FieldMatch(String),
    /// Value must compare to another field's value with `operator`.
    FieldCompare {
        /// The other field.
        field: String,
        /// Required relation between this value and the other field.
        operator: CompareOperator,
    },
    /// Apply `rules` (built-ins only) when `condition` holds.
    Conditional {
        /// Guard evaluated against the context snapshot.
        condition: Condition,
        /// Nested rules, evaluated in order until one fails.
        rules: Vec<Rule>,
    },
    /// Decided entirely by the rule's custom check.
    Custom,
    /// A kind whose params did not parse, kept verbatim because a custom
    /// check replaces its built-in behavior.
    Deferred {
        /// Declared kind, still used as the entry code.
        kind: RuleKind,
        /// Params as loaded.
        params: Option<Value>,
    },
}

impl Check {
    /// Kind of this check.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Required => RuleKind::Required,
            Self::MinLength(_) => RuleKind::MinLength,
            Self::MaxLength(_) => RuleKind::MaxLength,
            Self::Pattern(_) => RuleKind::Pattern,
            Self::Email => RuleKind::Email,
            Self::Url => RuleKind::Url,
            Self::Phone => RuleKind::Phone,
            Self::Min(_) => RuleKind::Min,
            Self::Max(_) => RuleKind::Max,
            Self::Integer => RuleKind::Integer,
            Self::Positive => RuleKind::Positive,
            Self::Negative => RuleKind::Negative,
            Self::DateMin(_) => RuleKind::DateMin,
            Self::DateMax(_) => RuleKind::DateMax,
            Self::DateFuture => RuleKind::DateFuture,
            Self::DatePast => RuleKind::DatePast,
            Self::MinItems(_) => RuleKind::MinItems,
            Self::MaxItems(_) => RuleKind::MaxItems,
            Self::UniqueItems => RuleKind::UniqueItems,
            Self::FieldMatch(_) => RuleKind::FieldMatch,
            Self::FieldCompare { .. } => RuleKind::FieldCompare,
            Self::Conditional { .. } => RuleKind::Conditional,
            Self::Custom => RuleKind::Custom,
            Self::Deferred { kind, .. } => *kind,
        }
    }

    /// Parses `params` for `kind`.
    pub fn from_params(kind: RuleKind, params: Option<Value>) -> Result<Self, SchemaError> {
        let name = kind.as_str();
        let check = match kind {
            RuleKind::Required => Self::Required,
            RuleKind::MinLength => Self::MinLength(count_param(name, params)?),
            RuleKind::MaxLength => Self::MaxLength(count_param(name, params)?),
            RuleKind::Pattern => {
                let source = required(name, params)?;
                let source = source
                    .as_str()
                    .ok_or_else(|| SchemaError::invalid_params(name, "expected a string"))?;
                Self::Pattern(Pattern::new(source)?)
            }
            RuleKind::Email => Self::Email,
            RuleKind::Url => Self::Url,
            RuleKind::Phone => Self::Phone,
            RuleKind::Min => Self::Min(number_param(name, params)?),
            RuleKind::Max => Self::Max(number_param(name, params)?),
            RuleKind::Integer => Self::Integer,
            RuleKind::Positive => Self::Positive,
            RuleKind::Negative => Self::Negative,
            RuleKind::DateMin => Self::DateMin(required(name, params)?),
            RuleKind::DateMax => Self::DateMax(required(name, params)?),
            RuleKind::DateFuture => Self::DateFuture,
            RuleKind::DatePast => Self::DatePast,
            RuleKind::MinItems => Self::MinItems(count_param(name, params)?),
            RuleKind::MaxItems => Self::MaxItems(count_param(name, params)?),
            RuleKind::UniqueItems => Self::UniqueItems,
            RuleKind::FieldMatch => Self::FieldMatch(string_param(name, params)?),
            RuleKind::FieldCompare => {
                let mut object = object_param(name, params)?;
                let field = take_string(name, &mut object, "field")?;
                let operator = take_string(name, &mut object, "operator")?
                    .parse()
                    .map_err(|reason: String| SchemaError::invalid_params(name, reason))?;
                Self::FieldCompare { field, operator }
            }
            RuleKind::Conditional => {
                let mut object = object_param(name, params)?;
                let condition = object
                    .remove("condition")
                    .map_or(Condition::Always, |raw| Condition::from_value(&raw));
                let rules = match object.remove("rules") {
                    Some(raw) => serde_json::from_value(raw)?,
                    None => Vec::new(),
                };
                Self::Conditional { condition, rules }
            }
            RuleKind::Custom => Self::Custom,
        };
        Ok(check)
    }

    /// Parameters in wire form, `None` for kinds without params.
    ///
    /// Conditionals holding a predicate condition cannot be expressed and
    /// yield `Err`.
    pub fn to_params(&self) -> Result<Option<Value>, serde_json::Error> {
        let params = match self {
            Self::MinLength(n) | Self::MaxLength(n) | Self::MinItems(n) | Self::MaxItems(n) => {
                Some(json!(n))
            }
            Self::Min(n) | Self::Max(n) => Some(json!(n)),
            Self::Pattern(pattern) => Some(json!(pattern.as_str())),
            Self::DateMin(bound) | Self::DateMax(bound) => Some(bound.clone()),
            Self::FieldMatch(field) => Some(json!(field)),
            Self::FieldCompare { field, operator } => {
                Some(json!({"field": field, "operator": operator.as_str()}))
            }
            Self::Conditional { condition, rules } => Some(json!({
                "condition": serde_json::to_value(condition)?,
                "rules": serde_json::to_value(rules)?,
            })),
            Self::Required
            | Self::Email
            | Self::Url
            | Self::Phone
            | Self::Integer
            | Self::Positive
            | Self::Negative
            | Self::DateFuture
            | Self::DatePast
            | Self::UniqueItems
            | Self::Custom => None,
            Self::Deferred { params, .. } => params.clone(),
        };
        Ok(params)
    }
}

fn required(kind: &'static str, params: Option<Value>) -> Result<Value, SchemaError> {
    match params {
        None | Some(Value::Null) => Err(SchemaError::MissingParams { kind }),
        Some(value) => Ok(value),
    }
}

fn count_param(kind: &'static str, params: Option<Value>) -> Result<usize, SchemaError> {
    let value = required(kind, params)?;
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        })
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SchemaError::invalid_params(kind, "expected a non-negative integer"))
}

fn number_param(kind: &'static str, params: Option<Value>) -> Result<f64, SchemaError> {
    required(kind, params)?
        .as_f64()
        .ok_or_else(|| SchemaError::invalid_params(kind, "expected a number"))
}

fn string_param(kind: &'static str, params: Option<Value>) -> Result<String, SchemaError> {
    match required(kind, params)? {
        Value::String(s) => Ok(s),
        _ => Err(SchemaError::invalid_params(kind, "expected a string")),
    }
}

fn object_param(kind: &'static str, params: Option<Value>) -> Result<Map<String, Value>, SchemaError> {
    match required(kind, params)? {
        Value::Object(object) => Ok(object),
        _ => Err(SchemaError::invalid_params(kind, "expected an object")),
    }
}

fn take_string(
    kind: &'static str,
    object: &mut Map<String, Value>,
    key: &str,
) -> Result<String, SchemaError> {
    match object.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(SchemaError::invalid_params(
            kind,
            format!("`{key}` must be a string"),
        )),
    }
}

// ============================================================================
// RULE
// ============================================================================

/// One declarative check with its message, severity and optional custom checks.
///
/// When `async_custom_check` or `custom_check` is set, that check replaces the
/// built-in behavior of [`Rule::check`]; the kind is still used as the entry
/// code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub struct Rule {
    /// Kind and parameters.
    pub check: Check,
    /// Message overriding the kind's default.
    pub message: Option<String>,
    /// Synchronous check to run instead of the built-in one.
    pub custom_check: Option<CheckId>,
    /// Asynchronous check to run instead of the built-in one. Takes priority
    /// over `custom_check`.
    pub async_custom_check: Option<CheckId>,
    /// Other fields this rule reads, for callers deciding what to revalidate.
    pub depends_on: Vec<String>,
    /// Classification of a failure.
    pub severity: Severity,
}

impl Rule {
    /// A rule with default message and `error` severity.
    #[must_use]
    pub fn new(check: Check) -> Self {
        Self {
            check,
            message: None,
            custom_check: None,
            async_custom_check: None,
            depends_on: Vec::new(),
            severity: Severity::Error,
        }
    }

    /// Kind of this rule.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        self.check.kind()
    }

    /// `required`
    #[must_use]
    pub fn required() -> Self {
        Self::new(Check::Required)
    }

    /// `min_length`
    #[must_use]
    pub fn min_length(min: usize) -> Self {
        Self::new(Check::MinLength(min))
    }

    /// `max_length`
    #[must_use]
    pub fn max_length(max: usize) -> Self {
        Self::new(Check::MaxLength(max))
    }

    /// `pattern` from source text.
    pub fn pattern(source: &str) -> Result<Self, SchemaError> {
        Ok(Self::new(Check::Pattern(Pattern::new(source)?)))
    }

    /// `pattern` from a precompiled expression.
    #[must_use]
    pub fn pattern_regex(regex: Regex) -> Self {
        Self::new(Check::Pattern(regex.into()))
    }

    /// `email`
    #[must_use]
    pub fn email() -> Self {
        Self::new(Check::Email)
    }

    /// `url`
    #[must_use]
    pub fn url() -> Self {
        Self::new(Check::Url)
    }

    /// `phone`
    #[must_use]
    pub fn phone() -> Self {
        Self::new(Check::Phone)
    }

    /// `min`
    #[must_use]
    pub fn min(min: f64) -> Self {
        Self::new(Check::Min(min))
    }

    /// `max`
    #[must_use]
    pub fn max(max: f64) -> Self {
        Self::new(Check::Max(max))
    }

    /// `integer`
    #[must_use]
    pub fn integer() -> Self {
        Self::new(Check::Integer)
    }

    /// `positive`
    #[must_use]
    pub fn positive() -> Self {
        Self::new(Check::Positive)
    }

    /// `negative`
    #[must_use]
    pub fn negative() -> Self {
        Self::new(Check::Negative)
    }

    /// `date_min`
    pub fn date_min(bound: impl Into<Value>) -> Self {
        Self::new(Check::DateMin(bound.into()))
    }

    /// `date_max`
    pub fn date_max(bound: impl Into<Value>) -> Self {
        Self::new(Check::DateMax(bound.into()))
    }

    /// `date_future`
    #[must_use]
    pub fn date_future() -> Self {
        Self::new(Check::DateFuture)
    }

    /// `date_past`
    #[must_use]
    pub fn date_past() -> Self {
        Self::new(Check::DatePast)
    }

    /// `min_items`
    #[must_use]
    pub fn min_items(min: usize) -> Self {
        Self::new(Check::MinItems(min))
    }

    /// `max_items`
    #[must_use]
    pub fn max_items(max: usize) -> Self {
        Self::new(Check::MaxItems(max))
    }

    /// `unique_items`
    #[must_use]
    pub fn unique_items() -> Self {
        Self::new(Check::UniqueItems)
    }

    /// `field_match`
    pub fn field_match(field: impl Into<String>) -> Self {
        Self::new(Check::FieldMatch(field.into()))
    }

    /// `field_compare`
    pub fn field_compare(field: impl Into<String>, operator: CompareOperator) -> Self {
        Self::new(Check::FieldCompare {
            field: field.into(),
            operator,
        })
    }

    /// `conditional`
    pub fn conditional(condition: Condition, rules: impl IntoIterator<Item = Rule>) -> Self {
        Self::new(Check::Conditional {
            condition,
            rules: rules.into_iter().collect(),
        })
    }

    /// A `custom` rule decided by the synchronous check `id`.
    pub fn custom(id: impl Into<CheckId>) -> Self {
        Self::new(Check::Custom).with_custom_check(id)
    }

    /// A `custom` rule decided by the asynchronous check `id`.
    pub fn custom_async(id: impl Into<CheckId>) -> Self {
        Self::new(Check::Custom).with_async_custom_check(id)
    }

    /// Overrides the default message.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the severity.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Shorthand for `with_severity(Severity::Warning)`.
    #[must_use = "builder methods must be chained or built"]
    pub fn as_warning(self) -> Self {
        self.with_severity(Severity::Warning)
    }

    /// Attaches a synchronous custom check.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_custom_check(mut self, id: impl Into<CheckId>) -> Self {
        self.custom_check = Some(id.into());
        self
    }

    /// Attaches an asynchronous custom check.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_async_custom_check(mut self, id: impl Into<CheckId>) -> Self {
        self.async_custom_check = Some(id.into());
        self
    }

    /// Declares a field this rule depends on.
    #[must_use = "builder methods must be chained or built"]
    pub fn depends_on(mut self, field: impl Into<String>) -> Self {
        self.depends_on.push(field.into());
        self
    }

    /// Parses a rule from JSON.
    pub fn from_json(value: Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Wire representation of a [`Rule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRule {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_check: Option<CheckId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    async_custom_check: Option<CheckId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(default)]
    severity: Severity,
}

impl TryFrom<RawRule> for Rule {
    type Error = SchemaError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let kind: RuleKind = raw.kind.parse()?;
        let replaced = raw.custom_check.is_some() || raw.async_custom_check.is_some();
        let check = match Check::from_params(kind, raw.params.clone()) {
            Ok(check) => check,
            Err(_) if replaced => Check::Deferred {
                kind,
                params: raw.params,
            },
            Err(err) => return Err(err),
        };
        Ok(Self {
            check,
            message: raw.message,
            custom_check: raw.custom_check,
            async_custom_check: raw.async_custom_check,
            depends_on: raw.depends_on,
            severity: raw.severity,
        })
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        // Predicate conditions have no wire form; they serialize without params.
        let params = rule.check.to_params().ok().flatten();
        Self {
            kind: rule.kind().as_str().to_owned(),
            params,
            message: rule.message,
            custom_check: rule.custom_check,
            async_custom_check: rule.async_custom_check,
            depends_on: rule.depends_on,
            severity: rule.severity,
        }
    }
}
