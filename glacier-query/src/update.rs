//! Update SQL for prepared command batches.
//!
//! Each batch from [`CommandBatchPreparer`](crate::batch::CommandBatchPreparer)
//! renders as exactly one statement:
//!
//! - write batches as `INSERT`, `UPDATE`, `DELETE` or `CALL`
//! - read-back batches as a `SELECT` of the store-generated columns
//!
//! Write statements carry a rows-affected expectation in their
//! [`ResultSetMapping`]; read-back statements carry the columns to propagate.

use glacier_types::{DbParameter, StoreValue, TypeMapping, TypeMappingSource};
use smol_str::SmolStr;

use crate::batch::{BatchRole, ColumnModification, EntityState, ModificationCommand, ModificationCommandBatch};
use crate::config::GlacierConfig;
use crate::error::{QueryError, QueryResult};
use crate::sql::SqlGenerationHelper;

/// How the host consumes the result of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSetMapping {
    /// The statement must report this many affected rows.
    RowsAffected(u64),
    /// The statement returns one row holding these columns.
    ReadBack { columns: Vec<SmolStr> },
    /// Nothing to consume.
    NoResults,
}

/// One rendered batch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSql {
    /// Statement text.
    pub sql: String,
    /// Parameters in placeholder order.
    pub parameters: Vec<DbParameter>,
    /// How the statement's result is consumed.
    pub result: ResultSetMapping,
}

/// Renders modification commands as Snowflake DML.
#[derive(Debug, Clone)]
pub struct UpdateSqlGenerator {
    helper: SqlGenerationHelper,
    types: &'static TypeMappingSource,
    log_sql: bool,
}

impl UpdateSqlGenerator {
    /// Create a generator with default settings.
    pub fn new() -> Self {
        Self {
            helper: SqlGenerationHelper::new(),
            types: TypeMappingSource::shared(),
            log_sql: false,
        }
    }

    /// Create a generator from loaded configuration.
    pub fn from_config(config: &GlacierConfig) -> Self {
        Self {
            helper: SqlGenerationHelper::from_config(config),
            types: TypeMappingSource::shared(),
            log_sql: config.debug.log_sql,
        }
    }

    /// Render a prepared batch.
    pub fn generate(&self, batch: &ModificationCommandBatch) -> QueryResult<BatchSql> {
        let [command] = batch.commands() else {
            return Err(QueryError::invalid_command(format!(
                "a batch must hold exactly one command, found {}",
                batch.len()
            )));
        };

        let rendered = match (batch.role(), &command.stored_procedure) {
            (BatchRole::ReadBack, _) => self.read_back(command),
            (BatchRole::Write, Some(_)) => self.call(command),
            (BatchRole::Write, None) => match command.entity_state {
                EntityState::Added => self.insert(command),
                EntityState::Modified => self.update(command),
                EntityState::Deleted => self.delete(command),
            },
        }
        .map_err(|e| e.with_table(command.table.as_str()))?;

        crate::glacier_sql!(
            self.log_sql,
            sql = %rendered.sql,
            parameters = rendered.parameters.len(),
            role = ?batch.role(),
            "Rendered modification command"
        );
        Ok(rendered)
    }

    /// `INSERT INTO t (cols) VALUES (...)`.
    ///
    /// Semi-structured values cannot be parsed inside `VALUES`, so such rows
    /// use `INSERT ... SELECT`.
    pub fn insert(&self, command: &ModificationCommand) -> QueryResult<BatchSql> {
        let mut sql = String::with_capacity(128);
        sql.push_str("INSERT INTO ");
        self.write_table(&mut sql, command);

        let written: Vec<&ColumnModification> = command.columns.iter().filter(|c| c.is_write).collect();
        let mut parameters = Vec::with_capacity(written.len());

        if written.is_empty() {
            let column = command
                .columns
                .iter()
                .find(|c| c.is_key && c.is_read)
                .or_else(|| command.columns.first())
                .ok_or_else(|| QueryError::invalid_command("insert has no columns"))?;
            sql.push_str(" (");
            self.helper.write_identifier(&mut sql, &column.column_name);
            sql.push_str(") VALUES (DEFAULT)");
        } else {
            let names: Vec<&str> = written.iter().map(|c| c.column_name.as_str()).collect();
            sql.push_str(" (");
            sql.push_str(&self.helper.column_list(&names));
            sql.push(')');

            let mut values = Vec::with_capacity(written.len());
            let mut wrapped = false;
            for column in &written {
                let (placeholder, parameter) = self.bind_written(column)?;
                wrapped |= placeholder != self.helper.parameter_placeholder(&parameter.name);
                values.push(placeholder);
                parameters.push(parameter);
            }
            if wrapped {
                sql.push_str(" SELECT ");
                sql.push_str(&values.join(", "));
            } else {
                sql.push_str(" VALUES (");
                sql.push_str(&values.join(", "));
                sql.push(')');
            }
        }

        Ok(BatchSql {
            sql,
            parameters,
            result: ResultSetMapping::RowsAffected(1),
        })
    }

    /// `UPDATE t SET ... WHERE ...`.
    pub fn update(&self, command: &ModificationCommand) -> QueryResult<BatchSql> {
        let mut sql = String::with_capacity(128);
        let mut parameters = Vec::new();
        sql.push_str("UPDATE ");
        self.write_table(&mut sql, command);
        sql.push_str(" SET ");

        for (i, column) in command.columns.iter().filter(|c| c.is_write).enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.helper.write_identifier(&mut sql, &column.column_name);
            sql.push_str(" = ");
            let (placeholder, parameter) = self.bind_written(column)?;
            sql.push_str(&placeholder);
            parameters.push(parameter);
        }

        self.write_conditions(&mut sql, &mut parameters, command)?;
        Ok(BatchSql {
            sql,
            parameters,
            result: ResultSetMapping::RowsAffected(1),
        })
    }

    /// `DELETE FROM t WHERE ...`.
    pub fn delete(&self, command: &ModificationCommand) -> QueryResult<BatchSql> {
        let mut sql = String::with_capacity(96);
        let mut parameters = Vec::new();
        sql.push_str("DELETE FROM ");
        self.write_table(&mut sql, command);
        self.write_conditions(&mut sql, &mut parameters, command)?;
        Ok(BatchSql {
            sql,
            parameters,
            result: ResultSetMapping::RowsAffected(1),
        })
    }

    /// `CALL proc(...)` with written values first, then original values.
    pub fn call(&self, command: &ModificationCommand) -> QueryResult<BatchSql> {
        let procedure = command
            .stored_procedure
            .as_ref()
            .ok_or_else(|| QueryError::internal("command has no stored procedure"))?;

        let mut sql = String::with_capacity(96);
        let mut parameters = Vec::new();
        let mut arguments = Vec::new();
        sql.push_str("CALL ");
        self.helper
            .write_qualified(&mut sql, &procedure.name, procedure.schema.as_deref());

        for column in command.columns.iter().filter(|c| c.is_write) {
            let (placeholder, parameter) = self.bind_written(column)?;
            arguments.push(placeholder);
            parameters.push(parameter);
        }
        for column in command.columns.iter().filter(|c| c.is_condition) {
            let (placeholder, parameter) = self.bind_original(column)?;
            arguments.push(placeholder);
            parameters.push(parameter);
        }
        sql.push('(');
        sql.push_str(&arguments.join(", "));
        sql.push(')');

        let read: Vec<SmolStr> = command
            .columns
            .iter()
            .filter(|c| c.is_read)
            .map(|c| c.column_name.clone())
            .collect();
        let result = if read.is_empty() {
            ResultSetMapping::NoResults
        } else {
            ResultSetMapping::ReadBack { columns: read }
        };
        Ok(BatchSql {
            sql,
            parameters,
            result,
        })
    }

    /// Select the store-generated columns of the row just written.
    ///
    /// A row whose key is generated is found by its written values, newest
    /// key first; identity columns are always `ORDER`, so the highest key is
    /// the row just inserted. Other rows are found by key.
    pub fn read_back(&self, command: &ModificationCommand) -> QueryResult<BatchSql> {
        let read: Vec<&ColumnModification> = command.columns.iter().filter(|c| c.is_read).collect();
        if read.is_empty() {
            return Err(QueryError::invalid_command("read-back batch has no columns to read"));
        }

        let mut sql = String::with_capacity(128);
        let mut parameters = Vec::new();
        sql.push_str("SELECT ");
        let names: Vec<&str> = read.iter().map(|c| c.column_name.as_str()).collect();
        sql.push_str(&self.helper.column_list(&names));
        sql.push_str(" FROM ");
        self.write_table(&mut sql, command);

        let generated_key = command
            .columns
            .iter()
            .find(|c| c.is_key && c.is_read && command.entity_state == EntityState::Added);

        let filters: Vec<&ColumnModification> = match generated_key {
            Some(_) => command.columns.iter().filter(|c| c.is_write).collect(),
            None => command.columns.iter().filter(|c| c.is_key).collect(),
        };
        if generated_key.is_none() && filters.is_empty() {
            return Err(QueryError::invalid_command(
                "read-back needs a key column to find the written row",
            ));
        }

        for (i, column) in filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.helper.write_identifier(&mut sql, &column.column_name);
            let value = if generated_key.is_some() {
                &column.value
            } else {
                column.match_value()
            };
            if generated_key.is_none() && value.is_null() {
                return Err(QueryError::invalid_command(
                    "read-back key column has no value to find the written row",
                )
                .with_table(command.table.as_str())
                .with_column(column.column_name.as_str()));
            }
            if value.is_null() {
                sql.push_str(" IS NULL");
                continue;
            }
            let name = column
                .parameter_name
                .as_deref()
                .or(column.original_parameter_name.as_deref())
                .ok_or_else(|| unnamed(column))?;
            let mapping = self.mapping_for(column, value)?;
            sql.push_str(" = ");
            sql.push_str(&mapping.wrap_placeholder(&self.helper.parameter_placeholder(name)));
            parameters.push(mapping.create_parameter(name, value.clone(), column.nullable));
        }

        if let Some(key) = generated_key {
            sql.push_str(" ORDER BY ");
            self.helper.write_identifier(&mut sql, &key.column_name);
            sql.push_str(" DESC LIMIT 1");
        }

        Ok(BatchSql {
            sql,
            parameters,
            result: ResultSetMapping::ReadBack {
                columns: read.iter().map(|c| c.column_name.clone()).collect(),
            },
        })
    }

    fn write_table(&self, sql: &mut String, command: &ModificationCommand) {
        self.helper
            .write_qualified(sql, &command.table, command.schema.as_deref());
    }

    fn write_conditions(
        &self,
        sql: &mut String,
        parameters: &mut Vec<DbParameter>,
        command: &ModificationCommand,
    ) -> QueryResult<()> {
        let conditions: Vec<&ColumnModification> =
            command.columns.iter().filter(|c| c.is_condition).collect();
        if conditions.is_empty() {
            return Err(QueryError::invalid_command(
                "update and delete commands need at least one condition column",
            ));
        }

        for (i, column) in conditions.into_iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.helper.write_identifier(sql, &column.column_name);
            if column.match_value().is_null() {
                sql.push_str(" IS NULL");
            } else {
                let (placeholder, parameter) = self.bind_original(column)?;
                sql.push_str(" = ");
                sql.push_str(&placeholder);
                parameters.push(parameter);
            }
        }
        Ok(())
    }

    fn bind_written(&self, column: &ColumnModification) -> QueryResult<(String, DbParameter)> {
        let name = column.parameter_name.as_deref().ok_or_else(|| unnamed(column))?;
        self.bind(column, name, &column.value)
    }

    fn bind_original(&self, column: &ColumnModification) -> QueryResult<(String, DbParameter)> {
        let name = column
            .original_parameter_name
            .as_deref()
            .ok_or_else(|| unnamed(column))?;
        self.bind(column, name, column.match_value())
    }

    fn bind(
        &self,
        column: &ColumnModification,
        name: &str,
        value: &StoreValue,
    ) -> QueryResult<(String, DbParameter)> {
        let mapping = self.mapping_for(column, value)?;
        let placeholder = mapping.wrap_placeholder(&self.helper.parameter_placeholder(name));
        Ok((placeholder, mapping.create_parameter(name, value.clone(), column.nullable)))
    }

    fn mapping_for(&self, column: &ColumnModification, value: &StoreValue) -> QueryResult<TypeMapping> {
        match &column.type_mapping {
            Some(mapping) => Ok(mapping.clone()),
            None => self.types.find_for_value(value).ok_or_else(|| {
                QueryError::invalid_parameter(&column.column_name, "no type mapping for value")
                    .with_column(column.column_name.as_str())
            }),
        }
    }
}

impl Default for UpdateSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn unnamed(column: &ColumnModification) -> QueryError {
    QueryError::invalid_command(format!(
        "column '{}' has no parameter name; prepare the batch before rendering it",
        column.column_name
    ))
    .with_column(column.column_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{CommandBatchPreparer, CommandGraph};
    use crate::error::ErrorCode;
    use glacier_types::{BindingType, LogicalType};
    use pretty_assertions::assert_eq;

    fn prepare(commands: Vec<ModificationCommand>) -> Vec<ModificationCommandBatch> {
        CommandBatchPreparer::new(&GlacierConfig::default())
            .unwrap()
            .prepare(commands, &CommandGraph::new())
            .unwrap()
    }

    fn render_all(commands: Vec<ModificationCommand>) -> Vec<BatchSql> {
        let generator = UpdateSqlGenerator::new();
        prepare(commands)
            .iter()
            .map(|b| generator.generate(b).unwrap())
            .collect()
    }

    #[test]
    fn test_identity_insert_and_read_back() {
        let command = ModificationCommand::insert("Orders")
            .in_schema("SALES")
            .column(ColumnModification::read("Id").key())
            .column(ColumnModification::write("Customer", "ALFKI"))
            .column(ColumnModification::write("Note", StoreValue::Null));
        let rendered = render_all(vec![command]);

        assert_eq!(rendered.len(), 2);
        assert_eq!(
            rendered[0].sql,
            r#"INSERT INTO "SALES"."Orders" ("Customer", "Note") VALUES (:p0, :p1)"#
        );
        assert_eq!(rendered[0].result, ResultSetMapping::RowsAffected(1));
        assert_eq!(
            rendered[1].sql,
            r#"SELECT "Id" FROM "SALES"."Orders" WHERE "Customer" = :p0 AND "Note" IS NULL ORDER BY "Id" DESC LIMIT 1"#
        );
        assert_eq!(rendered[1].parameters.len(), 1);
        assert_eq!(
            rendered[1].result,
            ResultSetMapping::ReadBack {
                columns: vec![SmolStr::new("Id")]
            }
        );
    }

    #[test]
    fn test_insert_only_generated_columns() {
        let command = ModificationCommand::insert("Counters").column(ColumnModification::read("Id").key());
        let rendered = render_all(vec![command]);
        assert_eq!(rendered[0].sql, r#"INSERT INTO "Counters" ("Id") VALUES (DEFAULT)"#);
        assert_eq!(
            rendered[1].sql,
            r#"SELECT "Id" FROM "Counters" ORDER BY "Id" DESC LIMIT 1"#
        );
    }

    #[test]
    fn test_update_with_computed_read_back() {
        let command = ModificationCommand::update("Orders")
            .column(ColumnModification::write("Qty", 3))
            .column(ColumnModification::read("Total"))
            .column(ColumnModification::condition("Id", 7).key())
            .column(ColumnModification::condition("Version", StoreValue::Null));
        let rendered = render_all(vec![command]);

        assert_eq!(
            rendered[0].sql,
            r#"UPDATE "Orders" SET "Qty" = :p0 WHERE "Id" = :p1 AND "Version" IS NULL"#
        );
        assert_eq!(rendered[0].parameters.len(), 2);
        assert_eq!(rendered[0].parameters[1].value, StoreValue::Int(7));
        assert_eq!(rendered[1].sql, r#"SELECT "Total" FROM "Orders" WHERE "Id" = :p1"#);
    }

    #[test]
    fn test_read_back_key_without_value_is_rejected() {
        let command = ModificationCommand::update("Orders")
            .column(ColumnModification::write("Qty", 3))
            .column(ColumnModification::read("Total"))
            .column(ColumnModification::new("Id").key());
        let err = UpdateSqlGenerator::new().read_back(&command).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCommand);
        assert_eq!(err.context.table.as_deref(), Some("Orders"));
        assert_eq!(err.context.column.as_deref(), Some("Id"));
    }

    #[test]
    fn test_delete() {
        let command = ModificationCommand::delete("Orders").column(ColumnModification::condition("Id", 7).key());
        let rendered = render_all(vec![command]);
        assert_eq!(rendered[0].sql, r#"DELETE FROM "Orders" WHERE "Id" = :p0"#);
        assert_eq!(rendered[0].parameters[0].binding, BindingType::Fixed);
    }

    #[test]
    fn test_delete_without_condition_is_rejected() {
        let command = ModificationCommand::delete("Orders").column(ColumnModification::new("Id").key());
        let batches = prepare(vec![command]);
        let err = UpdateSqlGenerator::new().generate(&batches[0]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCommand);
        assert_eq!(err.context.table.as_deref(), Some("Orders"));
    }

    #[test]
    fn test_stored_procedure_call() {
        let command = ModificationCommand::update("Orders")
            .with_stored_procedure("update_order", Some("SALES"))
            .column(ColumnModification::write("Qty", 3))
            .column(ColumnModification::condition("Id", 7).key());
        let rendered = render_all(vec![command]);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].sql, r#"CALL "SALES"."update_order"(:p0, :p1)"#);
        assert_eq!(rendered[0].result, ResultSetMapping::NoResults);
    }

    #[test]
    fn test_semi_structured_insert_uses_select() {
        let variant = TypeMappingSource::shared()
            .find_logical(LogicalType::Json)
            .unwrap();
        let command = ModificationCommand::insert("Events")
            .column(ColumnModification::write("Id", 1).key())
            .column(
                ColumnModification::write("Payload", serde_json::json!({"a": 1}))
                    .with_type_mapping(variant),
            );
        let rendered = render_all(vec![command]);
        assert_eq!(
            rendered[0].sql,
            r#"INSERT INTO "Events" ("Id", "Payload") SELECT :p0, PARSE_JSON(:p1)"#
        );
        assert_eq!(rendered[0].parameters[1].value, StoreValue::from(r#"{"a":1}"#));
    }

    #[test]
    fn test_unprepared_command_is_rejected() {
        let command = ModificationCommand::insert("Orders").column(ColumnModification::write("Name", "x"));
        let err = UpdateSqlGenerator::new().insert(&command).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCommand);
        assert_eq!(err.context.column.as_deref(), Some("Name"));
    }
}
