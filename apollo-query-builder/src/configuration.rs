//! Logic for loading configuration in to an object model
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Configuration error.
#[derive(Debug, Error, Display)]
pub enum ConfigurationError {
    /// could not parse configuration: {0}
    Parse(#[from] serde_yaml::Error),
    /// {message}: {value}
    InvalidConfiguration { message: &'static str, value: String },
}

/// The configuration for the query builder.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with `serde_json::json!` and `serde_json::from_value`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// GraphQL endpoint used for schema introspection and query execution.
    pub endpoint: Option<Url>,

    /// Default HTTP headers sent to the endpoint. Headers given when a session starts
    /// override these.
    pub headers: IndexMap<String, String>,

    /// What to do when the schema cannot be fetched.
    pub schema_validation: SchemaValidation,

    /// Ceilings protecting against pathological operations and inputs.
    pub limits: Limits,

    /// Time budgets for calls to the endpoint.
    pub timeouts: Timeouts,

    /// Session storage settings.
    pub sessions: Sessions,
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration = if s.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(s)?
        };
        configuration.validate()?;
        Ok(configuration)
    }
}

impl Configuration {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.sessions.capacity == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "sessions.capacity must be greater than zero",
                value: self.sessions.capacity.to_string(),
            });
        }
        if self.sessions.save_attempts == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "sessions.save_attempts must be greater than zero",
                value: self.sessions.save_attempts.to_string(),
            });
        }
        if let Some(endpoint) = &self.endpoint {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(ConfigurationError::InvalidConfiguration {
                    message: "endpoint must be an http or https URL",
                    value: endpoint.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Policy applied when the schema cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchemaValidation {
    /// Fail the operation.
    #[default]
    Strict,
    /// Proceed with syntax-only checks and report a warning.
    Advisory,
}

/// Operation and input ceilings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum nesting depth of the operation; defaults to 12
    pub max_depth: usize,
    /// Maximum number of selected fields; defaults to 200
    pub max_fields: usize,
    /// Maximum weighted complexity score; defaults to 2500
    pub max_score: f64,
    /// Maximum length of a string value; defaults to 8192
    pub max_string_length: usize,
    /// Maximum value of a pagination argument set as a string; defaults to 500
    pub max_pagination: u64,
    /// Maximum value of a pagination argument set as a typed value; defaults to 100
    pub max_typed_pagination: u64,
    /// Maximum nesting depth of a caller supplied value; defaults to 10
    pub max_input_depth: usize,
    /// Maximum cumulative number of properties and elements in a caller supplied value;
    /// defaults to 1000
    pub max_input_properties: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 12,
            max_fields: 200,
            max_score: 2500.0,
            max_string_length: 8192,
            max_pagination: 500,
            max_typed_pagination: 100,
            max_input_depth: 10,
            max_input_properties: 1000,
        }
    }
}

/// Time budgets for external calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Timeouts {
    /// Budget for schema introspection and ordinary execution, in human-readable format;
    /// defaults to 30s
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub default: Duration,

    /// Budget for executions flagged as expensive; defaults to 120s
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub expensive: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(30),
            expensive: Duration::from_secs(120),
        }
    }
}

/// Session storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Sessions {
    /// Idle time after which a session expires; defaults to 1h
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub ttl: Duration,

    /// Maximum number of live sessions kept in memory; defaults to 10000
    pub capacity: usize,

    /// Attempts made to persist a session before giving up; defaults to 3
    pub save_attempts: u32,

    /// Delay before the first retry, doubled on each subsequent one; defaults to 50ms
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub retry_backoff: Duration,
}

impl Default for Sessions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            capacity: 10_000,
            save_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}
