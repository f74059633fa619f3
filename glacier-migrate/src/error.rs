//! Error types for DDL generation.

use glacier_query::QueryError;
use glacier_types::TypeError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while lowering migration operations.
///
/// Nothing here is retryable: the same operations fail the same way until the
/// model or migration changes.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Snowflake cannot express the operation.
    #[error("{operation} is not supported by Snowflake: {reason}")]
    Unsupported {
        /// The operation kind.
        operation: &'static str,
        /// What the caller must do instead.
        reason: String,
    },

    /// The operation is malformed.
    #[error("Invalid migration operation: {0}")]
    InvalidOperation(String),

    /// A type could not be resolved or a literal could not be formatted.
    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] QueryError),
}

impl MigrationError {
    /// Create an unsupported-operation error.
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            reason: reason.into(),
        }
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Check if the dialect rejected the operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Check if this is a recoverable error. Always false.
    pub fn is_recoverable(&self) -> bool {
        false
    }
}
