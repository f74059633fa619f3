//! Configuration file parsing for `glacier.toml`.
//!
//! ```rust
//! use glacier_query::config::{GlacierConfig, IndexHandling};
//!
//! let config = GlacierConfig::from_str(r#"
//!     [dialect]
//!     index_handling = "ignore"
//! "#).unwrap();
//! assert_eq!(config.dialect.index_handling, IndexHandling::Ignore);
//! assert_eq!(config.batching.min_batch_size, 1);
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

static ENV_VAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

/// Main configuration structure for `glacier.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlacierConfig {
    /// Dialect behavior.
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Command batching.
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Query rendering.
    #[serde(default)]
    pub query: QueryConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

impl GlacierConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration_parse(format!("Failed to read {}", path.display()))
                .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);

        let config: Self = toml::from_str(&expanded).map_err(|e| {
            QueryError::configuration_parse(format!("Invalid glacier.toml: {}", e.message()))
                .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings Snowflake cannot honor.
    pub fn validate(&self) -> QueryResult<()> {
        if self.batching.min_batch_size > 1 {
            return Err(QueryError::invalid_configuration(format!(
                "min_batch_size = {} is not supported; Snowflake executes one command per batch",
                self.batching.min_batch_size
            ))
            .with_suggestion("Set [batching] min_batch_size = 1 or remove it"));
        }
        if self.batching.max_batch_size == 0 {
            return Err(QueryError::invalid_configuration(
                "max_batch_size must be at least 1",
            ));
        }
        if self.dialect.max_identifier_length == 0 {
            return Err(QueryError::invalid_configuration(
                "max_identifier_length must be at least 1",
            ));
        }
        if self.query.escape_char.chars().count() != 1 {
            return Err(QueryError::invalid_configuration(format!(
                "escape_char must be a single character, got {:?}",
                self.query.escape_char
            )));
        }
        if self.query.parameter_prefix.is_empty() {
            return Err(QueryError::invalid_configuration(
                "parameter_prefix must not be empty",
            ));
        }
        Ok(())
    }
}

/// How index operations are lowered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexHandling {
    /// Index operations fail generation.
    #[default]
    Disallow,
    /// Index operations produce no SQL.
    Ignore,
}

/// Dialect configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialectConfig {
    /// Schema used when an operation names none.
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Index handling mode.
    #[serde(default)]
    pub index_handling: IndexHandling,

    /// Maximum identifier length.
    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            default_schema: None,
            index_handling: IndexHandling::default(),
            max_identifier_length: default_max_identifier_length(),
        }
    }
}

fn default_max_identifier_length() -> usize {
    255
}

/// Command batching configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchingConfig {
    /// Minimum commands per batch. Only 1 is accepted.
    #[serde(default = "default_batch_size")]
    pub min_batch_size: usize,

    /// Maximum commands per batch.
    #[serde(default = "default_batch_size")]
    pub max_batch_size: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            min_batch_size: default_batch_size(),
            max_batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    1
}

/// Query rendering configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// LIKE escape character.
    #[serde(default = "default_escape_char")]
    pub escape_char: String,

    /// Parameter placeholder prefix.
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: String,
}

impl QueryConfig {
    /// The escape character.
    pub fn escape(&self) -> char {
        self.escape_char.chars().next().unwrap_or('\\')
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            escape_char: default_escape_char(),
            parameter_prefix: default_parameter_prefix(),
        }
    }
}

fn default_escape_char() -> String {
    "\\".to_string()
}

fn default_parameter_prefix() -> String {
    ":".to_string()
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log rendered SQL at debug level.
    #[serde(default)]
    pub log_sql: bool,
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    match ENV_VAR.as_ref() {
        Some(re) => re
            .replace_all(content, |caps: &Captures<'_>| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned(),
        None => content.to_string(),
    }
}
