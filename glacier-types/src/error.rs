//! Error types for type mapping and literal handling.

use thiserror::Error;

/// Result type alias for type mapping operations.
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors raised while resolving types or formatting/parsing literals.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    /// No mapping exists for the requested type.
    #[error("no Snowflake type mapping for {0}")]
    Unmapped(String),

    /// A store type name could not be parsed.
    #[error("invalid store type '{0}'")]
    InvalidStoreType(String),

    /// A SQL literal could not be parsed back into a value.
    #[error("cannot parse literal `{literal}` as {store_type}")]
    LiteralParse {
        /// The literal text.
        literal: String,
        /// The store type it was parsed against.
        store_type: String,
    },

    /// The value does not fit the mapping it was formatted with.
    #[error("value {value} cannot be represented as {store_type}")]
    ValueMismatch {
        /// Debug rendering of the value.
        value: String,
        /// The target store type.
        store_type: String,
    },
}

impl TypeError {
    /// Create an unmapped-type error.
    pub fn unmapped(what: impl Into<String>) -> Self {
        Self::Unmapped(what.into())
    }

    /// Create a literal parse error.
    pub fn literal_parse(literal: impl Into<String>, store_type: impl Into<String>) -> Self {
        Self::LiteralParse {
            literal: literal.into(),
            store_type: store_type.into(),
        }
    }

    /// Create a value mismatch error.
    pub fn value_mismatch(value: impl std::fmt::Debug, store_type: impl Into<String>) -> Self {
        Self::ValueMismatch {
            value: format!("{:?}", value),
            store_type: store_type.into(),
        }
    }
}
