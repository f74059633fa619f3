//! Error types for query rendering and command planning.
//!
//! Error codes follow a pattern: G{category}{number}
//! - 1xxx: Query shape errors (constructs Snowflake cannot express)
//! - 5xxx: Planning errors (batch ordering, malformed commands, parameters)
//! - 6xxx: Data errors (type mapping, literal formatting)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use glacier_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unsupported_query("OUTER APPLY");
//! assert_eq!(err.code, ErrorCode::UnsupportedQuery);
//! assert!(err.to_string().starts_with("[G1001]"));
//! assert!(!err.is_retryable());
//! ```

use std::fmt;

use glacier_types::TypeError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query shape errors (1xxx)
    /// The query uses a construct the dialect cannot express (G1001).
    UnsupportedQuery = 1001,
    /// An expression node cannot be rendered (G1002).
    UnsupportedExpression = 1002,
    /// The select expression is malformed (G1003).
    InvalidSelect = 1003,

    // Planning errors (5xxx)
    /// Row commands depend on each other in a cycle (G5001).
    DependencyCycle = 5001,
    /// A modification command is malformed (G5002).
    InvalidCommand = 5002,
    /// A parameter is invalid (G5003).
    InvalidParameter = 5003,
    /// A parameter value was not supplied (G5004).
    MissingParameter = 5004,

    // Data errors (6xxx)
    /// A value or type could not be mapped (G6001).
    InvalidDataType = 6001,

    // Configuration errors (7xxx)
    /// Invalid configuration (G7001).
    InvalidConfiguration = 7001,
    /// Configuration could not be read or parsed (G7002).
    ConfigurationParse = 7002,

    // Internal errors (9xxx)
    /// Internal error (G9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "G1001").
    pub fn code(&self) -> String {
        format!("G{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnsupportedQuery => "Unsupported query construct",
            Self::UnsupportedExpression => "Unsupported expression",
            Self::InvalidSelect => "Invalid select expression",
            Self::DependencyCycle => "Command dependency cycle",
            Self::InvalidCommand => "Invalid modification command",
            Self::InvalidParameter => "Invalid parameter",
            Self::MissingParameter => "Missing parameter value",
            Self::InvalidDataType => "Invalid data type",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::ConfigurationParse => "Configuration parse error",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The table involved.
    pub table: Option<String>,
    /// The column involved.
    pub column: Option<String>,
    /// SQL rendered so far (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors raised while rendering queries or planning command batches.
///
/// Dialect errors are deterministic: retrying the same input fails the same way.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add the table involved.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.context.table = Some(table.into());
        self
    }

    /// Add the column involved.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.context.column = Some(column.into());
        self
    }

    /// Add the SQL rendered so far.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Add a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Attach a source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructors ==============

    /// A query construct the dialect cannot express.
    pub fn unsupported_query(construct: impl Into<String>) -> Self {
        let construct = construct.into();
        Self::new(
            ErrorCode::UnsupportedQuery,
            format!("{} is not supported by Snowflake", construct),
        )
    }

    /// An expression node with no Snowflake rendering.
    pub fn unsupported_expression(what: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UnsupportedExpression,
            format!("Cannot render expression: {}", what.into()),
        )
    }

    /// A malformed select expression.
    pub fn invalid_select(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSelect, message.into())
    }

    /// Row commands that depend on each other in a cycle.
    pub fn dependency_cycle(remaining: usize) -> Self {
        Self::new(
            ErrorCode::DependencyCycle,
            format!(
                "{} modification command(s) form a dependency cycle",
                remaining
            ),
        )
        .with_help("Break the cycle by saving one side of the relationship with a null reference first")
    }

    /// A malformed modification command.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCommand, message.into())
    }

    /// An invalid parameter.
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid parameter '{}': {}", name, message.into()),
        )
    }

    /// A parameter whose value was not supplied at execution time.
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingParameter,
            format!("No value supplied for parameter '{}'", name),
        )
    }

    /// Invalid configuration.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Configuration that could not be read or parsed.
    pub fn configuration_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationParse, message.into())
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Checks ==============

    /// Check if this error is about an unsupported construct.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UnsupportedQuery | ErrorCode::UnsupportedExpression
        )
    }

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidConfiguration | ErrorCode::ConfigurationParse
        )
    }

    /// Check if this error is retryable. Dialect errors never are.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref table) = self.context.table {
            output.push_str(&format!("  → Table: {}\n", table));
        }
        if let Some(ref column) = self.context.column {
            output.push_str(&format!("  → Column: {}\n", column));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                let mut end = 200;
                while !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end])
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<TypeError> for QueryError {
    fn from(err: TypeError) -> Self {
        QueryError::new(ErrorCode::InvalidDataType, err.to_string()).with_source(err)
    }
}
