//! # glacier-query
//!
//! Snowflake query text, command batches and update SQL for the Glacier
//! dialect layer.
//!
//! This crate provides:
//! - Identifier and parameter formatting (`SqlGenerationHelper`)
//! - The bound expression tree and the method-call translations Snowflake needs
//! - Query text generation with parameter de-duplication
//! - Command batch preparation with the mandatory write/read-back split
//! - INSERT/UPDATE/DELETE/CALL rendering for prepared batches
//! - TOML configuration, error types and `tracing` integration
//!
//! ## Queries
//!
//! ```rust
//! use glacier_query::expr::{SelectExpression, SqlExpression, TableSource};
//! use glacier_query::translate::{ExpressionTranslator, Method, MethodCall, Receiver};
//! use glacier_query::QuerySqlGenerator;
//!
//! let call = MethodCall::new(Receiver::String, Method::StartsWith)
//!     .on(SqlExpression::column("Name").of("c"))
//!     .arg(SqlExpression::constant("50%"));
//! let predicate = ExpressionTranslator::new().translate(&call).unwrap();
//!
//! let select = SelectExpression::new()
//!     .from(TableSource::table("Customers", "c"))
//!     .project(SqlExpression::column("Name").of("c"), None)
//!     .filter(predicate);
//!
//! let rendered = QuerySqlGenerator::new().render(&select).unwrap();
//! assert!(rendered.sql.ends_with(r#"LIKE '50\\%%' ESCAPE '\\'"#));
//! ```
//!
//! ## Writes
//!
//! ```rust
//! use glacier_query::batch::{ColumnModification, CommandBatchPreparer, CommandGraph, ModificationCommand};
//! use glacier_query::{GlacierConfig, UpdateSqlGenerator};
//!
//! let command = ModificationCommand::update("Orders")
//!     .column(ColumnModification::write("Qty", 3))
//!     .column(ColumnModification::condition("Id", 7).key());
//!
//! let batches = CommandBatchPreparer::new(&GlacierConfig::default())
//!     .unwrap()
//!     .prepare(vec![command], &CommandGraph::new())
//!     .unwrap();
//! let statement = UpdateSqlGenerator::new().generate(&batches[0]).unwrap();
//! assert_eq!(statement.sql, r#"UPDATE "Orders" SET "Qty" = :p0 WHERE "Id" = :p1"#);
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod expr;
pub mod generator;
#[macro_use]
pub mod logging;
pub mod pagination;
pub mod params;
pub mod sql;
pub mod translate;
pub mod types;
pub mod update;

pub use batch::{
    BatchRole, ColumnModification, CommandBatchPreparer, CommandGraph, EntityState,
    ModificationCommand, ModificationCommandBatch,
};
pub use config::{GlacierConfig, IndexHandling};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use expr::{SelectExpression, SqlExpression, TableSource};
pub use generator::{QuerySqlGenerator, RenderedQuery};
pub use pagination::Pagination;
pub use params::{ParameterPlan, QueryParameter};
pub use sql::{ParameterNameGenerator, SqlGenerationHelper};
pub use translate::ExpressionTranslator;
pub use types::{NullsOrder, SortOrder};
pub use update::{BatchSql, ResultSetMapping, UpdateSqlGenerator};

// Re-export the type layer so callers need one import path.
pub use glacier_types;
