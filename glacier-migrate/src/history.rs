//! Migration history tracking.
//!
//! The SQL text for the history table. Nothing here executes; a runner feeds
//! the statements to its own connection.

use chrono::{DateTime, Utc};
use glacier_query::{GlacierConfig, SqlGenerationHelper};
use glacier_types::{StoreValue, TypeMappingSource};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

use crate::error::MigrateResult;

/// Default history table name.
pub const DEFAULT_HISTORY_TABLE: &str = "__GlacierMigrationsHistory";

const MIGRATION_ID: &str = "MigrationId";
const PRODUCT_VERSION: &str = "ProductVersion";
const CHECKSUM: &str = "Checksum";
const APPLIED_AT: &str = "AppliedAt";

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration ID.
    pub id: String,
    /// Version of the tool that applied it.
    pub product_version: String,
    /// Checksum of the migration script.
    pub checksum: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// A record for a script applied now.
    pub fn new(id: impl Into<String>, product_version: impl Into<String>, script: &str) -> Self {
        Self {
            id: id.into(),
            product_version: product_version.into(),
            checksum: checksum(script),
            applied_at: Utc::now(),
        }
    }

    /// Check whether `script` is the script this record was taken from.
    pub fn matches(&self, script: &str) -> bool {
        self.checksum == checksum(script)
    }
}

/// Compute a SHA256 checksum of a script.
pub fn checksum(script: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(script.as_bytes());
    hex::encode(hasher.finalize())
}

/// SQL for the migrations history table.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    table: SmolStr,
    schema: Option<SmolStr>,
    helper: SqlGenerationHelper,
}

impl HistoryRepository {
    /// The default table in the session's current schema.
    pub fn new() -> Self {
        Self {
            table: SmolStr::new(DEFAULT_HISTORY_TABLE),
            schema: None,
            helper: SqlGenerationHelper::new(),
        }
    }

    /// The default table in the configured default schema.
    pub fn from_config(config: &GlacierConfig) -> Self {
        Self {
            table: SmolStr::new(DEFAULT_HISTORY_TABLE),
            schema: config.dialect.default_schema.as_deref().map(SmolStr::new),
            helper: SqlGenerationHelper::from_config(config),
        }
    }

    /// Use another table name.
    pub fn with_table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = table.into();
        self
    }

    /// Use an explicit schema.
    pub fn with_schema(mut self, schema: impl Into<SmolStr>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    fn qualified_table(&self) -> String {
        self.helper.delimit_qualified(&self.table, self.schema.as_deref())
    }

    fn column(&self, name: &str) -> String {
        self.helper.delimit_identifier(name)
    }

    /// A query returning a non-zero count when the table exists.
    pub fn exists_sql(&self) -> String {
        let schema = match &self.schema {
            Some(schema) => self.helper.string_literal(schema),
            None => "CURRENT_SCHEMA()".to_string(),
        };
        format!(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
            schema,
            self.helper.string_literal(&self.table)
        )
    }

    /// Create the table unless it exists.
    pub fn create_if_not_exists_sql(&self) -> String {
        let key = self.column(&format!("PK_{}", self.table));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
             {} VARCHAR(150) NOT NULL,\n    \
             {} VARCHAR(32) NOT NULL,\n    \
             {} VARCHAR(64) NOT NULL,\n    \
             {} TIMESTAMP_NTZ NOT NULL DEFAULT CURRENT_TIMESTAMP(),\n    \
             CONSTRAINT {} PRIMARY KEY ({})\n)",
            self.qualified_table(),
            self.column(MIGRATION_ID),
            self.column(PRODUCT_VERSION),
            self.column(CHECKSUM),
            self.column(APPLIED_AT),
            key,
            self.column(MIGRATION_ID)
        )
    }

    /// Select applied migrations in ID order.
    pub fn applied_migrations_sql(&self) -> String {
        format!(
            "SELECT {}, {}, {}, {} FROM {} ORDER BY {}",
            self.column(MIGRATION_ID),
            self.column(PRODUCT_VERSION),
            self.column(CHECKSUM),
            self.column(APPLIED_AT),
            self.qualified_table(),
            self.column(MIGRATION_ID)
        )
    }

    /// Record a migration as applied.
    pub fn insert_sql(&self, record: &MigrationRecord) -> MigrateResult<String> {
        let applied_at = TypeMappingSource::shared()
            .find_store_type("TIMESTAMP_NTZ")
            .ok_or_else(|| glacier_types::TypeError::unmapped("TIMESTAMP_NTZ"))?
            .literal(&StoreValue::from(record.applied_at.naive_utc()))?;

        Ok(format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES ({}, {}, {}, {})",
            self.qualified_table(),
            self.column(MIGRATION_ID),
            self.column(PRODUCT_VERSION),
            self.column(CHECKSUM),
            self.column(APPLIED_AT),
            self.helper.string_literal(&record.id),
            self.helper.string_literal(&record.product_version),
            self.helper.string_literal(&record.checksum),
            applied_at
        ))
    }

    /// Remove a migration's row.
    pub fn delete_sql(&self, migration_id: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.qualified_table(),
            self.column(MIGRATION_ID),
            self.helper.string_literal(migration_id)
        )
    }

    /// Open a block that runs only when the migration is not yet applied.
    pub fn begin_if_not_exists_sql(&self, migration_id: &str) -> String {
        self.begin_guard(migration_id, "NOT EXISTS")
    }

    /// Open a block that runs only when the migration is applied.
    pub fn begin_if_exists_sql(&self, migration_id: &str) -> String {
        self.begin_guard(migration_id, "EXISTS")
    }

    fn begin_guard(&self, migration_id: &str, test: &str) -> String {
        format!(
            "EXECUTE IMMEDIATE $$\nBEGIN\n    IF ({}(SELECT 1 FROM {} WHERE {} = {})) THEN",
            test,
            self.qualified_table(),
            self.column(MIGRATION_ID),
            self.helper.string_literal(migration_id)
        )
    }

    /// Close a block opened by a begin guard.
    pub fn end_sql(&self) -> &'static str {
        "    END IF;\nEND;\n$$"
    }
}

impl Default for HistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}
