//! DDL generation for Snowflake.
//!
//! [`DdlGenerator::generate`] lowers migration operations into SQL commands.
//! Every construct Snowflake cannot express is rejected with
//! [`MigrationError::Unsupported`] and the whole call fails; no partial
//! output is ever returned.
//!
//! ```rust
//! use glacier_migrate::ddl::DdlGenerator;
//! use glacier_migrate::operation::{ColumnDefinition, CreateTable, IdentitySpec, MigrationOperation};
//!
//! let create = CreateTable::new("Orders")
//!     .column(ColumnDefinition::new("Id", "NUMBER(38,0)").not_null().identity(IdentitySpec::default()))
//!     .column(ColumnDefinition::new("Customer", "VARCHAR(20)"))
//!     .primary_key(Some("PK_Orders"), &["Id"]);
//!
//! let commands = DdlGenerator::new()
//!     .generate(&[MigrationOperation::CreateTable(create)], None)
//!     .unwrap();
//! assert!(commands[0].sql.contains("AUTOINCREMENT START 1 INCREMENT 1 ORDER"));
//! ```

use glacier_query::{GlacierConfig, IndexHandling, SqlGenerationHelper};
use glacier_types::{StoreValue, TypeMapping, TypeMappingInfo, TypeMappingSource};
use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::model::ModelSnapshot;
use crate::operation::{
    AlterColumn, ColumnDefinition, CreateTable, ForeignKey, IdentitySpec, MigrationOperation,
    PrimaryKey, SeedRow, SequenceDefinition, TableKind, TableName, UniqueConstraint,
};

/// One SQL statement to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCommand {
    /// One statement, without a terminator.
    pub sql: String,
    /// Execute outside any ambient transaction.
    pub suppress_transaction: bool,
}

impl MigrationCommand {
    fn new(sql: String) -> Self {
        Self {
            sql,
            suppress_transaction: false,
        }
    }
}

/// A complete migration script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    /// Statements in execution order.
    pub commands: Vec<MigrationCommand>,
}

impl MigrationScript {
    /// The script text, one terminated statement per command.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(&command.sql);
            out.push_str(";\n\n");
        }
        out
    }

    /// Scripts never run inside a transaction.
    pub fn is_transactional(&self) -> bool {
        false
    }
}

/// Lowers migration operations into Snowflake DDL and DML.
#[derive(Debug, Clone)]
pub struct DdlGenerator {
    helper: SqlGenerationHelper,
    types: &'static TypeMappingSource,
    index_handling: IndexHandling,
    default_schema: Option<SmolStr>,
}

impl DdlGenerator {
    /// Create a generator with default settings.
    pub fn new() -> Self {
        Self {
            helper: SqlGenerationHelper::new(),
            types: TypeMappingSource::shared(),
            index_handling: IndexHandling::Disallow,
            default_schema: None,
        }
    }

    /// Create a generator from loaded configuration.
    pub fn from_config(config: &GlacierConfig) -> Self {
        Self {
            helper: SqlGenerationHelper::from_config(config),
            types: TypeMappingSource::shared(),
            index_handling: config.dialect.index_handling,
            default_schema: config.dialect.default_schema.as_deref().map(SmolStr::new),
        }
    }

    /// Lower operations into commands.
    ///
    /// Model-level settings from `model` override the configured ones.
    pub fn generate(
        &self,
        operations: &[MigrationOperation],
        model: Option<&ModelSnapshot>,
    ) -> MigrateResult<Vec<MigrationCommand>> {
        let context = Context {
            generator: self,
            index_handling: model.map_or(self.index_handling, |m| m.index_handling),
            default_schema: model
                .and_then(|m| m.default_schema.clone())
                .or_else(|| self.default_schema.clone()),
        };

        let mut commands = Vec::new();
        for operation in operations {
            let before = commands.len();
            context.operation(operation, &mut commands)?;
            debug!(
                operation = operation.kind_name(),
                statements = commands.len() - before,
                "Lowered migration operation"
            );
        }
        Ok(commands)
    }

    /// Lower operations into a script.
    ///
    /// The script never runs in an ambient transaction; a transactional
    /// request is overridden because Snowflake commits each DDL statement.
    pub fn generate_script(
        &self,
        operations: &[MigrationOperation],
        model: Option<&ModelSnapshot>,
        transactional: bool,
    ) -> MigrateResult<MigrationScript> {
        if transactional {
            debug!("Ignoring transactional script request; DDL scripts run without a transaction");
        }
        let commands = self
            .generate(operations, model)?
            .into_iter()
            .map(|command| MigrationCommand {
                suppress_transaction: true,
                ..command
            })
            .collect();
        Ok(MigrationScript { commands })
    }
}

impl Default for DdlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call settings.
struct Context<'g> {
    generator: &'g DdlGenerator,
    index_handling: IndexHandling,
    default_schema: Option<SmolStr>,
}

impl Context<'_> {
    fn helper(&self) -> &SqlGenerationHelper {
        &self.generator.helper
    }

    fn operation(&self, operation: &MigrationOperation, out: &mut Vec<MigrationCommand>) -> MigrateResult<()> {
        use MigrationOperation as Op;

        let kind = operation.kind_name();
        if operation.is_index_operation() {
            return match self.index_handling {
                IndexHandling::Disallow => Err(MigrationError::unsupported(
                    kind,
                    "Snowflake has no indexes; remove the index from the model or set \
                     [dialect] index_handling = \"ignore\"",
                )),
                IndexHandling::Ignore => {
                    warn!(operation = kind, "Ignoring index operation");
                    Ok(())
                }
            };
        }

        match operation {
            Op::EnsureSchema { name } => {
                let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", self.helper().delimit_identifier(name));
                out.push(MigrationCommand::new(sql));
            }
            Op::DropSchema { name } => {
                out.push(MigrationCommand::new(format!(
                    "DROP SCHEMA {}",
                    self.helper().delimit_identifier(name)
                )));
            }
            Op::CreateTable(create) => out.push(MigrationCommand::new(self.create_table(create)?)),
            Op::DropTable { table } => {
                out.push(MigrationCommand::new(format!("DROP TABLE {}", self.table(table))));
            }
            Op::RenameTable {
                table,
                new_name,
                new_schema,
            } => {
                let schema = new_schema.as_deref().or(table.schema.as_deref());
                let target = self.qualified(new_name, schema);
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} RENAME TO {}",
                    self.table(table),
                    target
                )));
            }
            Op::AlterTable {
                table,
                comment,
                old_comment,
                kind: new_kind,
                old_kind,
            } => {
                if new_kind != old_kind {
                    return Err(MigrationError::unsupported(
                        kind,
                        format!(
                            "a {} table cannot be converted to a {} table in place; drop and recreate it",
                            old_kind, new_kind
                        ),
                    ));
                }
                if comment != old_comment {
                    let sql = match comment {
                        Some(comment) => format!(
                            "ALTER TABLE {} SET COMMENT = {}",
                            self.table(table),
                            self.helper().string_literal(comment)
                        ),
                        None => format!("ALTER TABLE {} UNSET COMMENT", self.table(table)),
                    };
                    out.push(MigrationCommand::new(sql));
                }
            }
            Op::AddColumn { table, column } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    self.table(table),
                    self.column_definition(column)?
                )));
            }
            Op::DropColumn { table, name } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    self.table(table),
                    self.helper().delimit_identifier(name)
                )));
            }
            Op::AlterColumn(alter) => self.alter_column(alter, out)?,
            Op::RenameColumn {
                table,
                name,
                new_name,
            } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    self.table(table),
                    self.helper().delimit_identifier(name),
                    self.helper().delimit_identifier(new_name)
                )));
            }
            Op::CreateSequence(sequence) => out.push(MigrationCommand::new(self.create_sequence(sequence)?)),
            Op::AlterSequence {
                sequence,
                old_sequence,
            } => self.alter_sequence(sequence, old_sequence, out)?,
            Op::RenameSequence {
                name,
                schema,
                new_name,
            } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER SEQUENCE {} RENAME TO {}",
                    self.qualified(name, schema.as_deref()),
                    self.qualified(new_name, schema.as_deref())
                )));
            }
            Op::RestartSequence { .. } => {
                return Err(MigrationError::unsupported(
                    kind,
                    "Snowflake sequences cannot be restarted; drop and recreate the sequence with a new START",
                ));
            }
            Op::DropSequence { name, schema } => {
                out.push(MigrationCommand::new(format!(
                    "DROP SEQUENCE {}",
                    self.qualified(name, schema.as_deref())
                )));
            }
            Op::CreateIndex { .. } | Op::RenameIndex { .. } | Op::DropIndex { .. } => {}
            Op::AddPrimaryKey { table, key } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} ADD {}",
                    self.table(table),
                    self.primary_key(key)
                )));
            }
            Op::DropPrimaryKey { table } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} DROP PRIMARY KEY",
                    self.table(table)
                )));
            }
            Op::AddUniqueConstraint { table, constraint } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} ADD {}",
                    self.table(table),
                    self.unique(constraint)
                )));
            }
            Op::DropUniqueConstraint { table, name } | Op::DropForeignKey { table, name } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.table(table),
                    self.helper().delimit_identifier(name)
                )));
            }
            Op::AddForeignKey { table, key } => {
                out.push(MigrationCommand::new(format!(
                    "ALTER TABLE {} ADD {}",
                    self.table(table),
                    self.foreign_key(key)
                )));
            }
            Op::AddCheckConstraint { .. } | Op::DropCheckConstraint { .. } => {
                return Err(MigrationError::unsupported(
                    kind,
                    "Snowflake does not support check constraints; remove them from the model",
                ));
            }
            Op::InsertData {
                table,
                rows,
                column_types,
            } => {
                for row in rows {
                    out.push(MigrationCommand::new(self.insert_row(table, row, column_types)?));
                }
            }
            Op::UpdateData {
                table,
                rows,
                column_types,
            } => {
                for row in rows {
                    let mut sql = format!("UPDATE {} SET ", self.table(table));
                    if row.values.is_empty() {
                        return Err(MigrationError::invalid_operation(format!(
                            "seed update of {} sets no columns",
                            table.name
                        )));
                    }
                    let mut first = true;
                    for (column, value) in &row.values {
                        if !first {
                            sql.push_str(", ");
                        }
                        first = false;
                        self.helper().write_identifier(&mut sql, column);
                        sql.push_str(" = ");
                        sql.push_str(&self.seed_literal(column, value, column_types)?);
                    }
                    self.write_key_filter(&mut sql, table, &row.keys, column_types)?;
                    out.push(MigrationCommand::new(sql));
                }
            }
            Op::DeleteData {
                table,
                keys,
                column_types,
            } => {
                for key in keys {
                    let mut sql = format!("DELETE FROM {}", self.table(table));
                    self.write_key_filter(&mut sql, table, key, column_types)?;
                    out.push(MigrationCommand::new(sql));
                }
            }
            Op::Sql {
                sql,
                suppress_transaction,
            } => out.push(MigrationCommand {
                sql: sql.clone(),
                suppress_transaction: *suppress_transaction,
            }),
        }
        Ok(())
    }

    // ============== Names ==============

    fn qualified(&self, name: &str, schema: Option<&str>) -> String {
        let schema = schema.or(self.default_schema.as_deref());
        self.helper().delimit_qualified(name, schema)
    }

    fn table(&self, table: &TableName) -> String {
        self.qualified(&table.name, table.schema.as_deref())
    }

    fn column_names(&self, columns: &[SmolStr]) -> String {
        self.helper().column_list(columns)
    }

    // ============== Tables ==============

    fn create_table(&self, create: &CreateTable) -> MigrateResult<String> {
        if create.columns.is_empty() {
            return Err(MigrationError::invalid_operation(format!(
                "table {} has no columns",
                create.table.name
            )));
        }
        if create.kind == TableKind::Hybrid && create.primary_key.is_none() {
            return Err(MigrationError::unsupported(
                "CreateTable",
                format!("hybrid table {} requires a primary key", create.table.name),
            ));
        }

        let mut sql = String::from("CREATE ");
        if let Some(keyword) = create.kind.keyword() {
            sql.push_str(keyword);
            sql.push(' ');
        }
        sql.push_str("TABLE ");
        sql.push_str(&self.table(&create.table));
        sql.push_str(" (\n");

        let mut lines = Vec::with_capacity(create.columns.len() + 2);
        for column in &create.columns {
            lines.push(self.column_definition(column)?);
        }
        if let Some(key) = &create.primary_key {
            lines.push(self.primary_key(key));
        }
        for constraint in &create.unique_constraints {
            lines.push(self.unique(constraint));
        }
        for key in &create.foreign_keys {
            lines.push(self.foreign_key(key));
        }
        sql.push_str("    ");
        sql.push_str(&lines.join(",\n    "));
        sql.push_str("\n)");

        if let Some(comment) = &create.comment {
            sql.push_str(" COMMENT = ");
            sql.push_str(&self.helper().string_literal(comment));
        }
        Ok(sql)
    }

    fn primary_key(&self, key: &PrimaryKey) -> String {
        let columns = self.column_names(&key.columns);
        match &key.name {
            Some(name) => format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.helper().delimit_identifier(name),
                columns
            ),
            None => format!("PRIMARY KEY ({})", columns),
        }
    }

    fn unique(&self, constraint: &UniqueConstraint) -> String {
        let columns = self.column_names(&constraint.columns);
        match &constraint.name {
            Some(name) => format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.helper().delimit_identifier(name),
                columns
            ),
            None => format!("UNIQUE ({})", columns),
        }
    }

    fn foreign_key(&self, key: &ForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.helper().delimit_identifier(&key.name),
            self.column_names(&key.columns),
            self.qualified(&key.principal_table, key.principal_schema.as_deref()),
            self.column_names(&key.principal_columns)
        )
    }

    // ============== Columns ==============

    fn resolve(&self, column: &ColumnDefinition) -> Option<TypeMapping> {
        let info = match (&column.store_type, column.logical_type) {
            (Some(store_type), Some(logical)) => {
                TypeMappingInfo::for_store_type(store_type.as_str()).with_logical(logical)
            }
            (Some(store_type), None) => TypeMappingInfo::for_store_type(store_type.as_str()),
            (None, Some(logical)) => TypeMappingInfo::for_logical(logical),
            (None, None) => return None,
        };
        self.generator.types.resolve(&info)
    }

    /// The column type text: the resolved mapping's store type, or the text
    /// as written when no mapping applies.
    fn type_text(&self, column: &ColumnDefinition) -> Option<String> {
        self.resolve(column)
            .map(|m| m.store_type().to_string())
            .or_else(|| column.store_type.clone())
    }

    fn column_definition(&self, column: &ColumnDefinition) -> MigrateResult<String> {
        let mut sql = String::with_capacity(64);
        self.helper().write_identifier(&mut sql, &column.name);

        let type_text = self.type_text(column);
        match (&type_text, &column.computed_sql) {
            (Some(type_text), _) => {
                sql.push(' ');
                sql.push_str(type_text);
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(MigrationError::invalid_operation(format!(
                    "column {} has no store type",
                    column.name
                )));
            }
        }

        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(&self.helper().string_literal(collation));
        }

        if let Some(computed) = &column.computed_sql {
            if column.computed_stored {
                return Err(MigrationError::unsupported(
                    "ComputedColumn",
                    format!(
                        "stored computed column {} cannot be created; Snowflake computed columns are virtual",
                        column.name
                    ),
                ));
            }
            sql.push_str(" AS (");
            sql.push_str(computed);
            sql.push(')');
        }

        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

        match column.extension.identity {
            Some(identity) => {
                if column.computed_sql.is_some() {
                    return Err(MigrationError::invalid_operation(format!(
                        "column {} cannot be both computed and an identity",
                        column.name
                    )));
                }
                sql.push(' ');
                sql.push_str(&identity_clause(&identity));
            }
            None => {
                if let Some(default) = self.default_text(column)? {
                    sql.push_str(" DEFAULT ");
                    sql.push_str(&default);
                }
            }
        }

        if let Some(comment) = &column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.helper().string_literal(comment));
        }
        Ok(sql)
    }

    fn default_text(&self, column: &ColumnDefinition) -> MigrateResult<Option<String>> {
        if let Some(sql) = &column.default_sql {
            return Ok(Some(sql.clone()));
        }
        let Some(value) = &column.default_value else {
            return Ok(None);
        };
        let mapping = match self.resolve(column) {
            Some(mapping) => mapping,
            None => self
                .generator
                .types
                .find_for_value(value)
                .ok_or_else(|| glacier_types::TypeError::unmapped(format!("default of {}", column.name)))?,
        };
        Ok(Some(mapping.ddl_literal(value)?))
    }

    fn alter_column(&self, alter: &AlterColumn, out: &mut Vec<MigrationCommand>) -> MigrateResult<()> {
        const KIND: &str = "AlterColumn";
        let table = self.table(&alter.table);
        let column = &alter.column;
        let old = &alter.old_column;
        let name = self.helper().delimit_identifier(&column.name);

        if column.collation != old.collation {
            return Err(MigrationError::unsupported(
                KIND,
                format!(
                    "the collation of {} cannot be altered; drop and recreate the column",
                    column.name
                ),
            ));
        }
        if column.is_identity() && !old.is_identity() {
            return Err(MigrationError::unsupported(
                KIND,
                format!(
                    "{} cannot become an identity column; drop and recreate the column",
                    column.name
                ),
            ));
        }
        if column.computed_stored {
            return Err(MigrationError::unsupported(
                KIND,
                format!("stored computed column {} is not supported", column.name),
            ));
        }

        // A changed computed expression replaces the column outright.
        if column.computed_sql.is_some() && column.computed_sql != old.computed_sql {
            out.push(MigrationCommand::new(format!("ALTER TABLE {} DROP COLUMN {}", table, name)));
            out.push(MigrationCommand::new(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table,
                self.column_definition(column)?
            )));
            return Ok(());
        }

        let mut commands = Vec::new();
        let alter_column = |clause: &str| {
            MigrationCommand::new(format!("ALTER TABLE {} ALTER COLUMN {} {}", table, name, clause))
        };

        if old.is_identity() && !column.is_identity() {
            commands.push(alter_column("DROP DEFAULT"));
        }

        if column.computed_sql.is_none() {
            let new_type = self.type_text(column).ok_or_else(|| {
                MigrationError::invalid_operation(format!("column {} has no store type", column.name))
            })?;
            let changed = self
                .type_text(old)
                .is_none_or(|old_type| !old_type.eq_ignore_ascii_case(&new_type));
            if changed {
                commands.push(alter_column(&format!("SET DATA TYPE {}", new_type)));
            }
        }

        if old.nullable && !column.nullable {
            if let Some(default) = self.default_text(column)? {
                commands.push(MigrationCommand::new(format!(
                    "UPDATE {} SET {} = {} WHERE {} IS NULL",
                    table, name, default, name
                )));
            }
            commands.push(alter_column("SET NOT NULL"));
        } else if !old.nullable && column.nullable {
            commands.push(alter_column("DROP NOT NULL"));
        }

        if column.comment != old.comment {
            match &column.comment {
                Some(comment) => commands.push(alter_column(&format!(
                    "COMMENT {}",
                    self.helper().string_literal(comment)
                ))),
                None => commands.push(alter_column("UNSET COMMENT")),
            }
        }

        out.extend(commands);
        Ok(())
    }

    // ============== Sequences ==============

    fn create_sequence(&self, sequence: &SequenceDefinition) -> MigrateResult<String> {
        const KIND: &str = "CreateSequence";
        if sequence.cyclic {
            return Err(MigrationError::unsupported(KIND, "Snowflake sequences cannot cycle"));
        }
        if sequence.min_value.is_some() || sequence.max_value.is_some() {
            return Err(MigrationError::unsupported(
                KIND,
                "Snowflake sequences have no minimum or maximum value",
            ));
        }
        if sequence.increment == 0 {
            return Err(MigrationError::invalid_operation("sequence increment cannot be zero"));
        }

        let mut sql = format!(
            "CREATE SEQUENCE {} START = {} INCREMENT = {} {}",
            self.qualified(&sequence.name, sequence.schema.as_deref()),
            sequence.start,
            sequence.increment,
            sequence.extension.order_keyword()
        );
        if let Some(comment) = &sequence.comment {
            sql.push_str(" COMMENT = ");
            sql.push_str(&self.helper().string_literal(comment));
        }
        Ok(sql)
    }

    fn alter_sequence(
        &self,
        sequence: &SequenceDefinition,
        old: &SequenceDefinition,
        out: &mut Vec<MigrationCommand>,
    ) -> MigrateResult<()> {
        const KIND: &str = "AlterSequence";
        if sequence.cyclic || sequence.min_value.is_some() || sequence.max_value.is_some() {
            return Err(MigrationError::unsupported(
                KIND,
                "Snowflake sequences cannot cycle and have no minimum or maximum value",
            ));
        }
        if sequence.extension.ordered && !old.extension.ordered {
            return Err(MigrationError::unsupported(
                KIND,
                format!(
                    "sequence {} cannot be changed from NOORDER to ORDER; drop and recreate it",
                    sequence.name
                ),
            ));
        }

        let name = self.qualified(&sequence.name, sequence.schema.as_deref());
        if sequence.increment != old.increment {
            if sequence.increment == 0 {
                return Err(MigrationError::invalid_operation("sequence increment cannot be zero"));
            }
            out.push(MigrationCommand::new(format!(
                "ALTER SEQUENCE {} SET INCREMENT = {}",
                name, sequence.increment
            )));
        }
        if sequence.extension.ordered != old.extension.ordered {
            out.push(MigrationCommand::new(format!(
                "ALTER SEQUENCE {} SET {}",
                name,
                sequence.extension.order_keyword()
            )));
        }
        if sequence.comment != old.comment {
            let sql = match &sequence.comment {
                Some(comment) => format!(
                    "ALTER SEQUENCE {} SET COMMENT = {}",
                    name,
                    self.helper().string_literal(comment)
                ),
                None => format!("ALTER SEQUENCE {} UNSET COMMENT", name),
            };
            out.push(MigrationCommand::new(sql));
        }
        Ok(())
    }

    // ============== Seed data ==============

    fn seed_mapping(
        &self,
        column: &str,
        value: &StoreValue,
        column_types: &IndexMap<SmolStr, String>,
    ) -> MigrateResult<TypeMapping> {
        let types = self.generator.types;
        let mapping = match column_types.get(column) {
            Some(store_type) => types.find_store_type(store_type),
            None => types.find_for_value(value),
        };
        mapping.ok_or_else(|| {
            glacier_types::TypeError::unmapped(format!("seed value for column {}", column)).into()
        })
    }

    fn seed_literal(
        &self,
        column: &str,
        value: &StoreValue,
        column_types: &IndexMap<SmolStr, String>,
    ) -> MigrateResult<String> {
        Ok(self.seed_mapping(column, value, column_types)?.literal(value)?)
    }

    /// One `INSERT` per row. Rows holding semi-structured values use
    /// `INSERT ... SELECT`, since `PARSE_JSON` is rejected inside `VALUES`.
    fn insert_row(
        &self,
        table: &TableName,
        row: &SeedRow,
        column_types: &IndexMap<SmolStr, String>,
    ) -> MigrateResult<String> {
        if row.is_empty() {
            return Err(MigrationError::invalid_operation(format!(
                "seed row for {} has no values",
                table.name
            )));
        }

        let columns: Vec<&SmolStr> = row.keys().collect();
        let mut values = Vec::with_capacity(row.len());
        let mut semi_structured = false;
        for (column, value) in row {
            let mapping = self.seed_mapping(column, value, column_types)?;
            semi_structured |= !value.is_null() && mapping.kind().is_semi_structured();
            values.push(mapping.literal(value)?);
        }

        let mut sql = format!("INSERT INTO {} (", self.table(table));
        sql.push_str(&self.helper().column_list(&columns));
        if semi_structured {
            sql.push_str(") SELECT ");
            sql.push_str(&values.join(", "));
        } else {
            sql.push_str(") VALUES (");
            sql.push_str(&values.join(", "));
            sql.push(')');
        }
        Ok(sql)
    }

    fn write_key_filter(
        &self,
        sql: &mut String,
        table: &TableName,
        keys: &SeedRow,
        column_types: &IndexMap<SmolStr, String>,
    ) -> MigrateResult<()> {
        if keys.is_empty() {
            return Err(MigrationError::invalid_operation(format!(
                "seed data for {} is not keyed",
                table.name
            )));
        }
        for (i, (column, value)) in keys.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.helper().write_identifier(sql, column);
            if value.is_null() {
                sql.push_str(" IS NULL");
            } else {
                sql.push_str(" = ");
                sql.push_str(&self.seed_literal(column, value, column_types)?);
            }
        }
        Ok(())
    }
}

/// The identity clause for a column, as it is written in DDL.
pub fn identity_clause(spec: &IdentitySpec) -> String {
    format!("AUTOINCREMENT {}", spec.to_clause())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::SeedUpdate;
    use pretty_assertions::assert_eq;

    fn sql(operations: &[MigrationOperation]) -> Vec<String> {
        DdlGenerator::new()
            .generate(operations, None)
            .unwrap()
            .into_iter()
            .map(|c| c.sql)
            .collect()
    }

    fn alter(column: ColumnDefinition, old_column: ColumnDefinition) -> MigrationOperation {
        MigrationOperation::AlterColumn(AlterColumn {
            table: "Orders".into(),
            column,
            old_column,
        })
    }

    #[test]
    fn test_create_table() {
        let create = CreateTable::new(TableName::in_schema("Orders", "SALES"))
            .kind(TableKind::Transient)
            .column(
                ColumnDefinition::new("Id", "NUMBER(38,0)")
                    .not_null()
                    .identity(IdentitySpec::new(100, 10).unordered()),
            )
            .column(
                ColumnDefinition::new("Status", "string(20)")
                    .not_null()
                    .default_value("open")
                    .collation("en-ci"),
            )
            .column(ColumnDefinition::untyped("Total").computed("\"Qty\" * \"Price\"", false))
            .column(ColumnDefinition::new("Note", "VARCHAR").comment("free text"))
            .primary_key(Some("PK_Orders"), &["Id"])
            .unique(None, &["Status", "Note"])
            .comment("orders");

        assert_eq!(
            sql(&[MigrationOperation::CreateTable(create)]),
            vec![
                "CREATE TRANSIENT TABLE \"SALES\".\"Orders\" (\n    \
                 \"Id\" NUMBER(38,0) NOT NULL AUTOINCREMENT START 100 INCREMENT 10 NOORDER,\n    \
                 \"Status\" VARCHAR(20) COLLATE 'en-ci' NOT NULL DEFAULT 'open',\n    \
                 \"Total\" AS (\"Qty\" * \"Price\") NULL,\n    \
                 \"Note\" VARCHAR NULL COMMENT 'free text',\n    \
                 CONSTRAINT \"PK_Orders\" PRIMARY KEY (\"Id\"),\n    \
                 UNIQUE (\"Status\", \"Note\")\n) COMMENT = 'orders'"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_hybrid_table_requires_primary_key() {
        let create = CreateTable::new("Orders")
            .kind(TableKind::Hybrid)
            .column(ColumnDefinition::new("Id", "NUMBER(38,0)"));
        let err = DdlGenerator::new()
            .generate(&[MigrationOperation::CreateTable(create)], None)
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_stored_computed_column_is_rejected() {
        let op = MigrationOperation::AddColumn {
            table: "Orders".into(),
            column: ColumnDefinition::new("Total", "NUMBER(10,2)").computed("1", true),
        };
        let err = DdlGenerator::new().generate(&[op], None).unwrap_err();
        assert!(err.to_string().contains("stored computed column"));
    }

    #[test]
    fn test_alter_column_collation_is_rejected() {
        let op = alter(
            ColumnDefinition::new("Name", "VARCHAR(50)").collation("en-ci"),
            ColumnDefinition::new("Name", "VARCHAR(50)"),
        );
        let err = DdlGenerator::new().generate(&[op], None).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("drop and recreate"));
    }

    #[test]
    fn test_alter_column_identity_added_is_rejected() {
        let op = alter(
            ColumnDefinition::new("Id", "NUMBER(38,0)").identity(IdentitySpec::default()),
            ColumnDefinition::new("Id", "NUMBER(38,0)"),
        );
        assert!(DdlGenerator::new().generate(&[op], None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_alter_column_identity_removed() {
        let op = alter(
            ColumnDefinition::new("Id", "NUMBER(38,0)"),
            ColumnDefinition::new("Id", "NUMBER(38,0)").identity(IdentitySpec::default()),
        );
        assert_eq!(
            sql(&[op]),
            vec!["ALTER TABLE \"Orders\" ALTER COLUMN \"Id\" DROP DEFAULT"]
        );
    }

    #[test]
    fn test_alter_column_not_null_backfills_first() {
        let op = alter(
            ColumnDefinition::new("Qty", "NUMBER(10,0)").not_null().default_value(0),
            ColumnDefinition::new("Qty", "NUMBER(10,0)"),
        );
        assert_eq!(
            sql(&[op]),
            vec![
                "UPDATE \"Orders\" SET \"Qty\" = 0 WHERE \"Qty\" IS NULL",
                "ALTER TABLE \"Orders\" ALTER COLUMN \"Qty\" SET NOT NULL",
            ]
        );
    }

    #[test]
    fn test_alter_column_drop_not_null_and_type() {
        let op = alter(
            ColumnDefinition::new("Name", "VARCHAR(100)").comment("display name"),
            ColumnDefinition::new("Name", "VARCHAR(50)").not_null(),
        );
        assert_eq!(
            sql(&[op]),
            vec![
                "ALTER TABLE \"Orders\" ALTER COLUMN \"Name\" SET DATA TYPE VARCHAR(100)",
                "ALTER TABLE \"Orders\" ALTER COLUMN \"Name\" DROP NOT NULL",
                "ALTER TABLE \"Orders\" ALTER COLUMN \"Name\" COMMENT 'display name'",
            ]
        );
    }

    #[test]
    fn test_alter_column_unset_comment_only() {
        let op = alter(
            ColumnDefinition::new("Name", "VARCHAR(50)"),
            ColumnDefinition::new("Name", "varchar(50)").comment("old"),
        );
        assert_eq!(
            sql(&[op]),
            vec!["ALTER TABLE \"Orders\" ALTER COLUMN \"Name\" UNSET COMMENT"]
        );
    }

    #[test]
    fn test_alter_column_computed_recreates() {
        let op = alter(
            ColumnDefinition::untyped("Total").computed("\"Qty\" * 2", false),
            ColumnDefinition::untyped("Total").computed("\"Qty\"", false),
        );
        assert_eq!(
            sql(&[op]),
            vec![
                "ALTER TABLE \"Orders\" DROP COLUMN \"Total\"",
                "ALTER TABLE \"Orders\" ADD COLUMN \"Total\" AS (\"Qty\" * 2) NULL",
            ]
        );
    }

    #[test]
    fn test_alter_column_missing_type_is_rejected() {
        let op = alter(ColumnDefinition::untyped("Name"), ColumnDefinition::new("Name", "VARCHAR(50)"));
        let err = DdlGenerator::new().generate(&[op], None).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidOperation(_)));
    }

    #[test]
    fn test_index_handling() {
        let op = MigrationOperation::CreateIndex {
            name: "IX_Orders_Customer".into(),
            table: "Orders".into(),
            columns: vec!["Customer".into()],
            unique: false,
        };
        let generator = DdlGenerator::new();
        let err = generator.generate(std::slice::from_ref(&op), None).unwrap_err();
        assert!(err.is_unsupported());

        let model = ModelSnapshot::new().with_index_handling(IndexHandling::Ignore);
        assert!(generator.generate(&[op], Some(&model)).unwrap().is_empty());
    }

    #[test]
    fn test_sequences() {
        let mut sequence = SequenceDefinition::new("OrderNumbers");
        sequence.start = 1000;
        let create = MigrationOperation::CreateSequence(sequence.clone());

        let mut altered = sequence.clone();
        altered.increment = 5;
        altered.extension.ordered = false;
        let alter = MigrationOperation::AlterSequence {
            sequence: altered,
            old_sequence: sequence,
        };

        assert_eq!(
            sql(&[create, alter]),
            vec![
                "CREATE SEQUENCE \"OrderNumbers\" START = 1000 INCREMENT = 1 ORDER",
                "ALTER SEQUENCE \"OrderNumbers\" SET INCREMENT = 5",
                "ALTER SEQUENCE \"OrderNumbers\" SET NOORDER",
            ]
        );
    }

    #[test]
    fn test_sequence_unsupported_forms() {
        let restart = MigrationOperation::RestartSequence {
            name: "S".into(),
            schema: None,
            start: Some(1),
        };
        assert!(DdlGenerator::new().generate(&[restart], None).unwrap_err().is_unsupported());

        let mut cyclic = SequenceDefinition::new("S");
        cyclic.cyclic = true;
        let err = DdlGenerator::new()
            .generate(&[MigrationOperation::CreateSequence(cyclic)], None)
            .unwrap_err();
        assert!(err.is_unsupported());

        let mut unordered = SequenceDefinition::new("S");
        unordered.extension.ordered = false;
        let to_ordered = MigrationOperation::AlterSequence {
            sequence: SequenceDefinition::new("S"),
            old_sequence: unordered,
        };
        assert!(DdlGenerator::new().generate(&[to_ordered], None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_check_constraints_are_rejected() {
        let op = MigrationOperation::AddCheckConstraint {
            table: "Orders".into(),
            name: "CK_Qty".into(),
            sql: "\"Qty\" > 0".into(),
        };
        assert!(DdlGenerator::new().generate(&[op], None).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_failure_discards_earlier_output() {
        let ops = [
            MigrationOperation::EnsureSchema { name: "SALES".into() },
            MigrationOperation::DropCheckConstraint {
                table: "Orders".into(),
                name: "CK_Qty".into(),
            },
        ];
        assert!(DdlGenerator::new().generate(&ops, None).is_err());
    }

    #[test]
    fn test_seed_data_one_statement_per_row() {
        let mut first = SeedRow::new();
        first.insert("Id".into(), StoreValue::from(1));
        first.insert("Name".into(), StoreValue::from("O'Brien"));
        let mut second = SeedRow::new();
        second.insert("Id".into(), StoreValue::from(2));
        second.insert("Name".into(), StoreValue::Null);

        let insert = MigrationOperation::InsertData {
            table: "People".into(),
            rows: vec![first, second],
            column_types: IndexMap::new(),
        };

        let mut keys = SeedRow::new();
        keys.insert("Id".into(), StoreValue::from(1));
        let mut values = SeedRow::new();
        values.insert("Name".into(), StoreValue::from("Ann"));
        let update = MigrationOperation::UpdateData {
            table: "People".into(),
            rows: vec![SeedUpdate {
                keys: keys.clone(),
                values,
            }],
            column_types: IndexMap::new(),
        };
        let delete = MigrationOperation::DeleteData {
            table: "People".into(),
            keys: vec![keys],
            column_types: IndexMap::new(),
        };

        assert_eq!(
            sql(&[insert, update, delete]),
            vec![
                "INSERT INTO \"People\" (\"Id\", \"Name\") VALUES (1, 'O''Brien')",
                "INSERT INTO \"People\" (\"Id\", \"Name\") VALUES (2, NULL)",
                "UPDATE \"People\" SET \"Name\" = 'Ann' WHERE \"Id\" = 1",
                "DELETE FROM \"People\" WHERE \"Id\" = 1",
            ]
        );
    }

    #[test]
    fn test_seed_data_with_variant_uses_select() {
        let mut row = SeedRow::new();
        row.insert("Id".into(), StoreValue::from(1));
        row.insert("Doc".into(), StoreValue::from(serde_json::json!({"k": "v"})));
        let mut column_types = IndexMap::new();
        column_types.insert(SmolStr::new("Doc"), "VARIANT".to_string());

        let insert = MigrationOperation::InsertData {
            table: "Docs".into(),
            rows: vec![row],
            column_types,
        };
        assert_eq!(
            sql(&[insert]),
            vec![r#"INSERT INTO "Docs" ("Id", "Doc") SELECT 1, PARSE_JSON('{"k":"v"}')"#]
        );
    }

    #[test]
    fn test_default_schema_applies() {
        let model = ModelSnapshot::new().with_default_schema("PUBLIC");
        let commands = DdlGenerator::new()
            .generate(&[MigrationOperation::DropTable { table: "Orders".into() }], Some(&model))
            .unwrap();
        assert_eq!(commands[0].sql, "DROP TABLE \"PUBLIC\".\"Orders\"");
    }

    #[test]
    fn test_script_never_transactional() {
        let ops = [
            MigrationOperation::EnsureSchema { name: "SALES".into() },
            MigrationOperation::Sql {
                sql: "SELECT 1".into(),
                suppress_transaction: false,
            },
        ];
        let script = DdlGenerator::new().generate_script(&ops, None, true).unwrap();
        assert!(!script.is_transactional());
        assert!(script.commands.iter().all(|c| c.suppress_transaction));
        assert_eq!(
            script.to_sql(),
            "CREATE SCHEMA IF NOT EXISTS \"SALES\";\n\nSELECT 1;\n\n"
        );
    }

    #[test]
    fn test_constraints_and_renames() {
        let ops = [
            MigrationOperation::AddForeignKey {
                table: "Lines".into(),
                key: ForeignKey {
                    name: "FK_Lines_Orders".into(),
                    columns: vec!["OrderId".into()],
                    principal_table: "Orders".into(),
                    principal_schema: None,
                    principal_columns: vec!["Id".into()],
                },
            },
            MigrationOperation::DropPrimaryKey { table: "Lines".into() },
            MigrationOperation::RenameColumn {
                table: "Lines".into(),
                name: "Qty".into(),
                new_name: "Quantity".into(),
            },
            MigrationOperation::RenameTable {
                table: "Lines".into(),
                new_name: "OrderLines".into(),
                new_schema: None,
            },
        ];
        assert_eq!(
            sql(&ops),
            vec![
                "ALTER TABLE \"Lines\" ADD CONSTRAINT \"FK_Lines_Orders\" FOREIGN KEY (\"OrderId\") REFERENCES \"Orders\" (\"Id\")",
                "ALTER TABLE \"Lines\" DROP PRIMARY KEY",
                "ALTER TABLE \"Lines\" RENAME COLUMN \"Qty\" TO \"Quantity\"",
                "ALTER TABLE \"Lines\" RENAME TO \"OrderLines\"",
            ]
        );
    }

    #[test]
    fn test_identity_clause() {
        assert_eq!(
            identity_clause(&IdentitySpec::parse("START 5 INCREMENT 1").unwrap()),
            "AUTOINCREMENT START 5 INCREMENT 1 ORDER"
        );
    }
}
