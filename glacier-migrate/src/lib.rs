//! # glacier-migrate
//!
//! Snowflake DDL generation for the Glacier dialect layer.
//!
//! This crate provides:
//! - The abstract migration operation model with Snowflake extension payloads
//! - `DdlGenerator`, which lowers operations to DDL and seed-data DML and
//!   rejects what Snowflake cannot express
//! - Design-time and runtime annotation views
//! - SQL for the migrations history table
//!
//! ## Example
//!
//! ```rust
//! use glacier_migrate::{AlterColumn, ColumnDefinition, DdlGenerator, MigrationOperation};
//!
//! let op = MigrationOperation::AlterColumn(AlterColumn {
//!     table: "Orders".into(),
//!     column: ColumnDefinition::new("Qty", "NUMBER(10,0)").not_null().default_value(0),
//!     old_column: ColumnDefinition::new("Qty", "NUMBER(10,0)"),
//! });
//!
//! let commands = DdlGenerator::new().generate(&[op], None).unwrap();
//! assert_eq!(commands[0].sql, r#"UPDATE "Orders" SET "Qty" = 0 WHERE "Qty" IS NULL"#);
//! assert_eq!(commands[1].sql, r#"ALTER TABLE "Orders" ALTER COLUMN "Qty" SET NOT NULL"#);
//! ```

pub mod annotations;
pub mod ddl;
pub mod error;
pub mod history;
pub mod model;
pub mod operation;

pub use annotations::{Annotation, AnnotationValue, AnnotationView, DesignTimeView, RuntimeView};
pub use ddl::{DdlGenerator, MigrationCommand, MigrationScript};
pub use error::{MigrateResult, MigrationError};
pub use history::{HistoryRepository, MigrationRecord, checksum};
pub use model::{ColumnModel, ModelSnapshot, SequenceModel, TableModel};
pub use operation::{
    AlterColumn, ColumnDefinition, ColumnExtension, CreateTable, ForeignKey, IdentitySpec,
    MigrationOperation, PrimaryKey, SeedRow, SeedUpdate, SequenceDefinition, SequenceExtension,
    TableKind, TableName, UniqueConstraint,
};
