//! Migration operations and their Snowflake extension payloads.
//!
//! Operations arrive from the host's model differ and are consumed once.
//! Dialect-specific details (identity clauses, sequence ordering, table kind)
//! travel as typed payloads on the operation rather than as loose annotations.

use std::fmt;
use std::sync::LazyLock;

use glacier_types::{LogicalType, StoreValue};
use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{MigrateResult, MigrationError};

/// The kind of Snowflake table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    #[default]
    Permanent,
    Transient,
    Temporary,
    Hybrid,
}

impl TableKind {
    /// The keyword placed between `CREATE` and `TABLE`, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::Permanent => None,
            Self::Transient => Some("TRANSIENT"),
            Self::Temporary => Some("TEMPORARY"),
            Self::Hybrid => Some("HYBRID"),
        }
    }

    /// Name used in annotations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Transient => "transient",
            Self::Temporary => "temporary",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static IDENTITY_CLAUSE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:AUTOINCREMENT|IDENTITY)\s*)?(?:START\s+(?:WITH\s+|=\s*)?(-?\d+)\s+INCREMENT\s+(?:BY\s+|=\s*)?(-?\d+)|\(\s*(-?\d+)\s*,\s*(-?\d+)\s*\))?\s*(ORDER|NOORDER)?\s*$",
    )
    .ok()
});

/// Seed, increment and ordering of an identity column.
///
/// Identity columns are always written with an explicit ordering keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentitySpec {
    /// First generated value.
    pub start: i64,
    /// Step between generated values.
    pub increment: i64,
    /// `ORDER` when set, otherwise `NOORDER`.
    pub ordered: bool,
}

impl Default for IdentitySpec {
    fn default() -> Self {
        Self {
            start: 1,
            increment: 1,
            ordered: true,
        }
    }
}

impl IdentitySpec {
    /// Create an ordered identity.
    pub fn new(start: i64, increment: i64) -> Self {
        Self {
            start,
            increment,
            ordered: true,
        }
    }

    /// Generate values without ordering guarantees.
    pub fn unordered(mut self) -> Self {
        self.ordered = false;
        self
    }

    /// Parse a stored identity clause.
    ///
    /// Accepts `START n INCREMENT m`, `(n, m)` and an empty clause, each
    /// optionally followed by `ORDER` or `NOORDER`. A clause without an
    /// ordering keyword is read as `ORDER`.
    pub fn parse(clause: &str) -> MigrateResult<Self> {
        let invalid = || MigrationError::invalid_operation(format!("invalid identity clause '{}'", clause));
        let regex = IDENTITY_CLAUSE.as_ref().ok_or_else(invalid)?;
        let caps = regex.captures(clause).ok_or_else(invalid)?;

        let number = |i: usize| -> MigrateResult<Option<i64>> {
            caps.get(i)
                .map(|m| m.as_str().parse::<i64>().map_err(|_| invalid()))
                .transpose()
        };
        let start = number(1)?.or(number(3)?).unwrap_or(1);
        let increment = number(2)?.or(number(4)?).unwrap_or(1);
        if increment == 0 {
            return Err(MigrationError::invalid_operation("identity increment cannot be zero"));
        }
        let ordered = caps
            .get(5)
            .is_none_or(|m| m.as_str().eq_ignore_ascii_case("ORDER"));

        Ok(Self {
            start,
            increment,
            ordered,
        })
    }

    /// The ordering keyword.
    pub fn order_keyword(&self) -> &'static str {
        if self.ordered { "ORDER" } else { "NOORDER" }
    }

    /// `START n INCREMENT m ORDER|NOORDER`.
    pub fn to_clause(&self) -> String {
        format!(
            "START {} INCREMENT {} {}",
            self.start,
            self.increment,
            self.order_keyword()
        )
    }
}

/// Snowflake payload for a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnExtension {
    /// Present when the column is an identity column.
    pub identity: Option<IdentitySpec>,
}

impl ColumnExtension {
    /// An identity column with the given spec.
    pub fn identity(spec: IdentitySpec) -> Self {
        Self {
            identity: Some(spec),
        }
    }

    /// An identity column from a stored clause.
    pub fn identity_from_clause(clause: &str) -> MigrateResult<Self> {
        IdentitySpec::parse(clause).map(Self::identity)
    }
}

/// Snowflake payload for a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceExtension {
    /// `ORDER` when set, otherwise `NOORDER`.
    pub ordered: bool,
}

impl Default for SequenceExtension {
    fn default() -> Self {
        Self { ordered: true }
    }
}

impl SequenceExtension {
    /// The ordering keyword.
    pub fn order_keyword(&self) -> &'static str {
        if self.ordered { "ORDER" } else { "NOORDER" }
    }
}

/// A column as it appears in a table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: SmolStr,
    /// Store type as written by the model, e.g. `VARCHAR(100)`.
    pub store_type: Option<String>,
    /// Host type, used to pick the mapping when the store type is shared.
    pub logical_type: Option<LogicalType>,
    pub nullable: bool,
    pub default_value: Option<StoreValue>,
    pub default_sql: Option<String>,
    pub computed_sql: Option<String>,
    /// Stored (materialized) computed column.
    pub computed_stored: bool,
    pub collation: Option<String>,
    pub comment: Option<String>,
    pub extension: ColumnExtension,
}

impl ColumnDefinition {
    /// A nullable column of the given store type.
    pub fn new(name: impl Into<SmolStr>, store_type: impl Into<String>) -> Self {
        Self {
            store_type: Some(store_type.into()),
            ..Self::untyped(name)
        }
    }

    /// A nullable column without a store type.
    pub fn untyped(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            store_type: None,
            logical_type: None,
            nullable: true,
            default_value: None,
            default_sql: None,
            computed_sql: None,
            computed_stored: false,
            collation: None,
            comment: None,
            extension: ColumnExtension::default(),
        }
    }

    pub fn logical(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = Some(logical_type);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<StoreValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn default_sql(mut self, sql: impl Into<String>) -> Self {
        self.default_sql = Some(sql.into());
        self
    }

    pub fn computed(mut self, sql: impl Into<String>, stored: bool) -> Self {
        self.computed_sql = Some(sql.into());
        self.computed_stored = stored;
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn identity(mut self, spec: IdentitySpec) -> Self {
        self.extension = ColumnExtension::identity(spec);
        self
    }

    /// Whether a default value or default SQL is set.
    pub fn has_default(&self) -> bool {
        self.default_value.is_some() || self.default_sql.is_some()
    }

    pub fn is_identity(&self) -> bool {
        self.extension.identity.is_some()
    }
}

/// A primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: Option<SmolStr>,
    pub columns: Vec<SmolStr>,
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: Option<SmolStr>,
    pub columns: Vec<SmolStr>,
}

/// A foreign key. Snowflake records but does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: SmolStr,
    pub columns: Vec<SmolStr>,
    pub principal_table: SmolStr,
    pub principal_schema: Option<SmolStr>,
    pub principal_columns: Vec<SmolStr>,
}

/// A table and its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub name: SmolStr,
    pub schema: Option<SmolStr>,
}

impl TableName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    pub fn in_schema(name: impl Into<SmolStr>, schema: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema.into()),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: TableName,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Option<PrimaryKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
    pub comment: Option<String>,
    pub kind: TableKind,
}

impl CreateTable {
    pub fn new(table: impl Into<TableName>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
            kind: TableKind::Permanent,
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.primary_key = Some(PrimaryKey {
            name: name.map(SmolStr::new),
            columns: columns.iter().map(SmolStr::new).collect(),
        });
        self
    }

    pub fn unique(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.unique_constraints.push(UniqueConstraint {
            name: name.map(SmolStr::new),
            columns: columns.iter().map(SmolStr::new).collect(),
        });
        self
    }

    pub fn foreign_key(mut self, key: ForeignKey) -> Self {
        self.foreign_keys.push(key);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }
}

/// `ALTER TABLE ... ALTER COLUMN` between two column states.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterColumn {
    pub table: TableName,
    pub column: ColumnDefinition,
    pub old_column: ColumnDefinition,
}

/// A sequence definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDefinition {
    pub name: SmolStr,
    pub schema: Option<SmolStr>,
    pub start: i64,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cyclic: bool,
    pub comment: Option<String>,
    pub extension: SequenceExtension,
}

impl SequenceDefinition {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            start: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cyclic: false,
            comment: None,
            extension: SequenceExtension::default(),
        }
    }
}

/// One row of seed data, column name to value.
pub type SeedRow = IndexMap<SmolStr, StoreValue>;

/// A seed-data update: the row's key values and the values to set.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedUpdate {
    pub keys: SeedRow,
    pub values: SeedRow,
}

/// An abstract schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOperation {
    EnsureSchema {
        name: SmolStr,
    },
    DropSchema {
        name: SmolStr,
    },
    CreateTable(CreateTable),
    DropTable {
        table: TableName,
    },
    RenameTable {
        table: TableName,
        new_name: SmolStr,
        new_schema: Option<SmolStr>,
    },
    AlterTable {
        table: TableName,
        comment: Option<String>,
        old_comment: Option<String>,
        kind: TableKind,
        old_kind: TableKind,
    },
    AddColumn {
        table: TableName,
        column: ColumnDefinition,
    },
    DropColumn {
        table: TableName,
        name: SmolStr,
    },
    AlterColumn(AlterColumn),
    RenameColumn {
        table: TableName,
        name: SmolStr,
        new_name: SmolStr,
    },
    CreateSequence(SequenceDefinition),
    AlterSequence {
        sequence: SequenceDefinition,
        old_sequence: SequenceDefinition,
    },
    RenameSequence {
        name: SmolStr,
        schema: Option<SmolStr>,
        new_name: SmolStr,
    },
    RestartSequence {
        name: SmolStr,
        schema: Option<SmolStr>,
        start: Option<i64>,
    },
    DropSequence {
        name: SmolStr,
        schema: Option<SmolStr>,
    },
    CreateIndex {
        name: SmolStr,
        table: TableName,
        columns: Vec<SmolStr>,
        unique: bool,
    },
    RenameIndex {
        name: SmolStr,
        new_name: SmolStr,
        table: TableName,
    },
    DropIndex {
        name: SmolStr,
        table: TableName,
    },
    AddPrimaryKey {
        table: TableName,
        key: PrimaryKey,
    },
    DropPrimaryKey {
        table: TableName,
    },
    AddUniqueConstraint {
        table: TableName,
        constraint: UniqueConstraint,
    },
    DropUniqueConstraint {
        table: TableName,
        name: SmolStr,
    },
    AddForeignKey {
        table: TableName,
        key: ForeignKey,
    },
    DropForeignKey {
        table: TableName,
        name: SmolStr,
    },
    AddCheckConstraint {
        table: TableName,
        name: SmolStr,
        sql: String,
    },
    DropCheckConstraint {
        table: TableName,
        name: SmolStr,
    },
    InsertData {
        table: TableName,
        rows: Vec<SeedRow>,
        /// Store types by column, for values whose mapping is ambiguous.
        column_types: IndexMap<SmolStr, String>,
    },
    UpdateData {
        table: TableName,
        rows: Vec<SeedUpdate>,
        column_types: IndexMap<SmolStr, String>,
    },
    DeleteData {
        table: TableName,
        keys: Vec<SeedRow>,
        column_types: IndexMap<SmolStr, String>,
    },
    /// Raw SQL passed through unchanged.
    Sql {
        sql: String,
        suppress_transaction: bool,
    },
}

impl MigrationOperation {
    /// The operation kind, as used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::EnsureSchema { .. } => "EnsureSchema",
            Self::DropSchema { .. } => "DropSchema",
            Self::CreateTable(_) => "CreateTable",
            Self::DropTable { .. } => "DropTable",
            Self::RenameTable { .. } => "RenameTable",
            Self::AlterTable { .. } => "AlterTable",
            Self::AddColumn { .. } => "AddColumn",
            Self::DropColumn { .. } => "DropColumn",
            Self::AlterColumn(_) => "AlterColumn",
            Self::RenameColumn { .. } => "RenameColumn",
            Self::CreateSequence(_) => "CreateSequence",
            Self::AlterSequence { .. } => "AlterSequence",
            Self::RenameSequence { .. } => "RenameSequence",
            Self::RestartSequence { .. } => "RestartSequence",
            Self::DropSequence { .. } => "DropSequence",
            Self::CreateIndex { .. } => "CreateIndex",
            Self::RenameIndex { .. } => "RenameIndex",
            Self::DropIndex { .. } => "DropIndex",
            Self::AddPrimaryKey { .. } => "AddPrimaryKey",
            Self::DropPrimaryKey { .. } => "DropPrimaryKey",
            Self::AddUniqueConstraint { .. } => "AddUniqueConstraint",
            Self::DropUniqueConstraint { .. } => "DropUniqueConstraint",
            Self::AddForeignKey { .. } => "AddForeignKey",
            Self::DropForeignKey { .. } => "DropForeignKey",
            Self::AddCheckConstraint { .. } => "AddCheckConstraint",
            Self::DropCheckConstraint { .. } => "DropCheckConstraint",
            Self::InsertData { .. } => "InsertData",
            Self::UpdateData { .. } => "UpdateData",
            Self::DeleteData { .. } => "DeleteData",
            Self::Sql { .. } => "Sql",
        }
    }

    /// Whether the operation touches an index.
    pub fn is_index_operation(&self) -> bool {
        matches!(
            self,
            Self::CreateIndex { .. } | Self::RenameIndex { .. } | Self::DropIndex { .. }
        )
    }
}
