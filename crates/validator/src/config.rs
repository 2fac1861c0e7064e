//! Engine configuration.
//!
//! ```toml
//! fault_policy = "propagate"
//! max_concurrent_fields = 8
//! fallback_message = "Invalid value"
//! ```
//!
//! Every key is optional. Environment variables override file values:
//!
//! - `FIELDCHECK_FAULT_POLICY` (`isolate` | `propagate`)
//! - `FIELDCHECK_MAX_CONCURRENT_FIELDS` (positive integer)
//! - `FIELDCHECK_FALLBACK_MESSAGE`

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ENV_FAULT_POLICY: &str = "FIELDCHECK_FAULT_POLICY";
const ENV_MAX_CONCURRENT_FIELDS: &str = "FIELDCHECK_MAX_CONCURRENT_FIELDS";
const ENV_FALLBACK_MESSAGE: &str = "FIELDCHECK_FALLBACK_MESSAGE";

/// What the engine does when a rule faults instead of deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Record an `error` entry with code `evaluator_fault` and keep going.
    #[default]
    Isolate,
    /// Abort the call and return the fault.
    Propagate,
}

impl FaultPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" => Some(Self::Isolate),
            "propagate" => Some(Self::Propagate),
            _ => None,
        }
    }
}

/// Settings for [`ValidationEngine`](crate::engine::ValidationEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Handling of evaluator faults.
    pub fault_policy: FaultPolicy,
    /// Upper bound on fields evaluated at once by `validate_fields`.
    pub max_concurrent_fields: usize,
    /// Message for a failing custom check when the rule has none.
    pub fallback_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::Isolate,
            max_concurrent_fields: 16,
            fallback_message: "Validation failed".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        Ok(config.normalized())
    }

    /// Defaults overridden by `FIELDCHECK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies `FIELDCHECK_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(std::env::vars())
    }

    /// Applies overrides from `(key, value)` pairs; unrelated keys are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let value = value.into();
            match key {
                ENV_FAULT_POLICY => {
                    self.fault_policy =
                        FaultPolicy::parse(&value).ok_or_else(|| invalid(key, &value))?;
                }
                ENV_MAX_CONCURRENT_FIELDS => {
                    self.max_concurrent_fields = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| invalid(key, &value))?;
                }
                ENV_FALLBACK_MESSAGE => self.fallback_message = value,
                _ => {}
            }
        }
        Ok(self.normalized())
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn max_concurrent_fields(mut self, limit: usize) -> Self {
        self.max_concurrent_fields = limit;
        self.normalized()
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    // A zero limit would stall `buffered`.
    fn normalized(mut self) -> Self {
        self.max_concurrent_fields = self.max_concurrent_fields.max(1);
        self
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}
