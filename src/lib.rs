//! # Glacier
//!
//! A Snowflake SQL dialect layer for an object-relational mapper.
//!
//! Glacier provides:
//! - Type mappings between logical value types and Snowflake store types
//! - Query text generation, including the method-call translations Snowflake needs
//! - Command batch preparation and INSERT/UPDATE/DELETE rendering
//! - DDL generation that rejects what Snowflake cannot express
//!
//! ## Quick Start
//!
//! ```rust
//! use glacier::prelude::*;
//!
//! let config = GlacierConfig::from_str(
//!     r#"
//!     [dialect]
//!     index_handling = "ignore"
//!     "#,
//! )
//! .unwrap();
//!
//! let mapping = TypeMappingSource::shared()
//!     .find_store_type("string(20)")
//!     .unwrap();
//! assert_eq!(mapping.store_type(), "VARCHAR(20)");
//!
//! let index = MigrationOperation::CreateIndex {
//!     name: "IX_Orders_Customer".into(),
//!     table: "Orders".into(),
//!     columns: vec!["Customer".into()],
//!     unique: false,
//! };
//! let commands = DdlGenerator::from_config(&config).generate(&[index], None).unwrap();
//! assert!(commands.is_empty());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Type mappings and store values.
pub mod types {
    pub use glacier_types::*;
}

/// Query text, batching and update SQL.
pub mod query {
    pub use glacier_query::*;
}

/// DDL generation and migration history SQL.
pub mod migrate {
    pub use glacier_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        ColumnDefinition, CreateTable, DdlGenerator, MigrationError, MigrationOperation,
        ModelSnapshot,
    };
    pub use crate::query::{
        CommandBatchPreparer, CommandGraph, ExpressionTranslator, GlacierConfig, IndexHandling,
        ModificationCommand, QueryError, QuerySqlGenerator, SelectExpression, SqlExpression,
        UpdateSqlGenerator,
    };
    pub use crate::types::{LogicalType, StoreValue, TypeMappingInfo, TypeMappingSource};
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, MigrationOperation};
pub use query::{GlacierConfig, QueryError};
pub use types::{TypeError, TypeMapping, TypeMappingSource};
