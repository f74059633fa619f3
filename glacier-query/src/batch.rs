//! Command batch preparation for row-level writes.
//!
//! Snowflake cannot return generated values from the statement that writes
//! them, and this layer sends one physical statement per row. Preparation
//! turns the pending modification commands into an ordered list of batches:
//!
//! 1. Commands are ordered by their foreign-key dependencies into sets.
//! 2. Each surviving command becomes its own write batch.
//! 3. A command with read-back columns is immediately followed by a read-only
//!    batch that selects those columns.
//!
//! ```rust
//! use glacier_query::batch::{
//!     BatchRole, ColumnModification, CommandBatchPreparer, CommandGraph, ModificationCommand,
//! };
//! use glacier_query::GlacierConfig;
//!
//! let insert = ModificationCommand::insert("Orders")
//!     .column(ColumnModification::read("Id").key())
//!     .column(ColumnModification::write("Customer", "ALFKI"));
//!
//! let preparer = CommandBatchPreparer::new(&GlacierConfig::default()).unwrap();
//! let batches = preparer.prepare(vec![insert], &CommandGraph::new()).unwrap();
//!
//! assert_eq!(batches.len(), 2);
//! assert_eq!(batches[0].role(), BatchRole::Write);
//! assert_eq!(batches[1].role(), BatchRole::ReadBack);
//! ```

use glacier_types::{StoreValue, TypeMapping};
use smol_str::SmolStr;
use tracing::debug;

use crate::config::GlacierConfig;
use crate::error::{QueryError, QueryResult};
use crate::sql::ParameterNameGenerator;

/// The state of the row a command writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// A new row, written with INSERT.
    Added,
    /// An existing row, written with UPDATE.
    Modified,
    /// A removed row, written with DELETE.
    Deleted,
}

/// One column's value and role within a row operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModification {
    /// Store column name.
    pub column_name: SmolStr,
    /// The value written, for `is_write` columns.
    pub value: StoreValue,
    /// The value the row is matched on, for `is_condition` columns.
    pub original_value: Option<StoreValue>,
    /// Mapping the value is bound with. Inferred from the value when absent.
    pub type_mapping: Option<TypeMapping>,
    /// The store generates this value and it must be read back.
    pub is_read: bool,
    /// The value is written to the column.
    pub is_write: bool,
    /// Part of the primary key.
    pub is_key: bool,
    /// The row is matched on the original value.
    pub is_condition: bool,
    /// Whether the bound parameter may be NULL.
    pub nullable: bool,
    /// Assigned during preparation.
    pub parameter_name: Option<String>,
    /// Assigned during preparation.
    pub original_parameter_name: Option<String>,
}

impl ColumnModification {
    /// A column with no role yet.
    pub fn new(column_name: impl Into<SmolStr>) -> Self {
        Self {
            column_name: column_name.into(),
            value: StoreValue::Null,
            original_value: None,
            type_mapping: None,
            is_read: false,
            is_write: false,
            is_key: false,
            is_condition: false,
            nullable: true,
            parameter_name: None,
            original_parameter_name: None,
        }
    }

    /// A column whose value is written.
    pub fn write(column_name: impl Into<SmolStr>, value: impl Into<StoreValue>) -> Self {
        Self {
            value: value.into(),
            is_write: true,
            ..Self::new(column_name)
        }
    }

    /// A store-generated column that is read back after the write.
    pub fn read(column_name: impl Into<SmolStr>) -> Self {
        Self {
            is_read: true,
            ..Self::new(column_name)
        }
    }

    /// A column the row is matched on.
    pub fn condition(column_name: impl Into<SmolStr>, original: impl Into<StoreValue>) -> Self {
        Self {
            original_value: Some(original.into()),
            is_condition: true,
            ..Self::new(column_name)
        }
    }

    /// Mark the column as part of the key.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.nullable = false;
        self
    }

    /// Set the type mapping the value is bound with.
    pub fn with_type_mapping(mut self, mapping: TypeMapping) -> Self {
        self.type_mapping = Some(mapping);
        self
    }

    /// The value the row is matched on, falling back to the written value.
    pub fn match_value(&self) -> &StoreValue {
        self.original_value.as_ref().unwrap_or(&self.value)
    }
}

/// A stored procedure that performs a command instead of generated DML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProcedure {
    pub name: SmolStr,
    /// Schema the procedure lives in. Unqualified when absent.
    pub schema: Option<SmolStr>,
}

/// One row's insert, update or delete.
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationCommand {
    /// Target table.
    pub table: SmolStr,
    /// Schema of the target table. Unqualified when absent.
    pub schema: Option<SmolStr>,
    /// Decides between INSERT, UPDATE and DELETE.
    pub entity_state: EntityState,
    pub columns: Vec<ColumnModification>,
    /// Run this procedure instead of generated DML.
    pub stored_procedure: Option<StoredProcedure>,
}

impl ModificationCommand {
    /// Create a command with no columns.
    pub fn new(table: impl Into<SmolStr>, entity_state: EntityState) -> Self {
        Self {
            table: table.into(),
            schema: None,
            entity_state,
            columns: Vec::new(),
            stored_procedure: None,
        }
    }

    /// An insert command.
    pub fn insert(table: impl Into<SmolStr>) -> Self {
        Self::new(table, EntityState::Added)
    }

    /// An update command.
    pub fn update(table: impl Into<SmolStr>) -> Self {
        Self::new(table, EntityState::Modified)
    }

    /// A delete command.
    pub fn delete(table: impl Into<SmolStr>) -> Self {
        Self::new(table, EntityState::Deleted)
    }

    /// Set the table's schema.
    pub fn in_schema(mut self, schema: impl Into<SmolStr>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column modification.
    pub fn column(mut self, column: ColumnModification) -> Self {
        self.columns.push(column);
        self
    }

    /// Perform the command through a stored procedure.
    pub fn with_stored_procedure(mut self, name: impl Into<SmolStr>, schema: Option<&str>) -> Self {
        self.stored_procedure = Some(StoredProcedure {
            name: name.into(),
            schema: schema.map(SmolStr::new),
        });
        self
    }

    /// Whether any column is written.
    pub fn has_changes(&self) -> bool {
        self.columns.iter().any(|c| c.is_write)
    }

    /// Whether a separate read-back statement must follow the write.
    ///
    /// Stored procedures return generated values themselves.
    pub fn needs_read_back(&self) -> bool {
        self.stored_procedure.is_none() && self.columns.iter().any(|c| c.is_read)
    }

    fn assign_parameter_names(&mut self, names: &mut ParameterNameGenerator) {
        for column in &mut self.columns {
            column.parameter_name = column.is_write.then(|| names.generate_next());
            column.original_parameter_name = column.is_condition.then(|| names.generate_next());
        }
    }
}

/// Foreign-key dependencies between pending commands, by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandGraph {
    edges: Vec<(usize, usize)>,
}

impl CommandGraph {
    /// An empty graph; all commands are independent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` must run after `principal`.
    pub fn add_dependency(&mut self, dependent: usize, principal: usize) -> &mut Self {
        self.edges.push((dependent, principal));
        self
    }

    /// Order `count` commands into dependency levels.
    ///
    /// Each level holds commands whose principals all sit in earlier levels,
    /// in their original order.
    pub fn levels(&self, count: usize) -> QueryResult<Vec<Vec<usize>>> {
        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for &(dependent, principal) in &self.edges {
            if dependent >= count || principal >= count {
                return Err(QueryError::invalid_command(format!(
                    "dependency {} -> {} refers to a command that is not pending ({} commands)",
                    dependent, principal, count
                )));
            }
            in_degree[dependent] += 1;
            dependents[principal].push(dependent);
        }

        let mut done = vec![false; count];
        let mut remaining = count;
        let mut levels = Vec::new();
        while remaining > 0 {
            let level: Vec<usize> = (0..count)
                .filter(|&i| !done[i] && in_degree[i] == 0)
                .collect();
            if level.is_empty() {
                return Err(QueryError::dependency_cycle(remaining));
            }
            for &i in &level {
                done[i] = true;
                for &dependent in &dependents[i] {
                    in_degree[dependent] -= 1;
                }
            }
            remaining -= level.len();
            levels.push(level);
        }
        Ok(levels)
    }
}

/// What a batch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchRole {
    /// Writes a row.
    Write,
    /// Reads store-generated values of the row just written.
    ReadBack,
}

/// Commands destined for one physical statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationCommandBatch {
    commands: Vec<ModificationCommand>,
    more_expected: bool,
    role: BatchRole,
}

impl ModificationCommandBatch {
    fn single(command: ModificationCommand, role: BatchRole, more_expected: bool) -> Self {
        Self {
            commands: vec![command],
            more_expected,
            role,
        }
    }

    /// The commands in the batch.
    pub fn commands(&self) -> &[ModificationCommand] {
        &self.commands
    }

    /// Whether further batches follow in the same save, which keeps the
    /// surrounding transaction open.
    pub fn more_expected(&self) -> bool {
        self.more_expected
    }

    /// The batch role.
    pub fn role(&self) -> BatchRole {
        self.role
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the batch has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Splits pending commands into dialect-legal batches.
#[derive(Debug, Clone)]
pub struct CommandBatchPreparer {
    log_sql: bool,
}

impl CommandBatchPreparer {
    /// Create a preparer. A minimum batch size above one is rejected.
    pub fn new(config: &GlacierConfig) -> QueryResult<Self> {
        if config.batching.min_batch_size > 1 {
            return Err(QueryError::invalid_configuration(format!(
                "min_batch_size = {} is not supported; Snowflake commands are sent one row per statement",
                config.batching.min_batch_size
            ))
            .with_help("Remove min_batch_size or set it to 1"));
        }
        Ok(Self {
            log_sql: config.debug.log_sql,
        })
    }

    /// Prepare batches for the pending commands.
    pub fn prepare(
        &self,
        commands: Vec<ModificationCommand>,
        graph: &CommandGraph,
    ) -> QueryResult<Vec<ModificationCommandBatch>> {
        let levels = graph.levels(commands.len())?;
        let mut slots: Vec<Option<ModificationCommand>> = commands.into_iter().map(Some).collect();

        let mut sets: Vec<Vec<ModificationCommand>> = Vec::with_capacity(levels.len());
        for level in levels {
            let mut set = Vec::with_capacity(level.len());
            for index in level {
                let Some(command) = slots[index].take() else {
                    continue;
                };
                if command.columns.is_empty() {
                    return Err(QueryError::invalid_command(
                        "a command must carry its column modifications before it is batched",
                    )
                    .with_table(command.table.as_str()));
                }
                if command.entity_state == EntityState::Modified && !command.has_changes() {
                    debug!(table = %command.table, "Skipping unchanged command");
                    continue;
                }
                set.push(command);
            }
            if !set.is_empty() {
                sets.push(set);
            }
        }

        let set_count = sets.len();
        let mut names = ParameterNameGenerator::new();
        let mut batches = Vec::new();
        for (set_index, set) in sets.into_iter().enumerate() {
            let more_sets = set_index + 1 < set_count;
            let set_len = set.len();
            for (position, mut command) in set.into_iter().enumerate() {
                let more_in_set = position + 1 < set_len;
                let read_back = command.needs_read_back();

                names.reset();
                command.assign_parameter_names(&mut names);
                let read_command = read_back.then(|| {
                    let mut read_command = command.clone();
                    names.reset();
                    read_command.assign_parameter_names(&mut names);
                    read_command
                });

                batches.push(ModificationCommandBatch::single(
                    command,
                    BatchRole::Write,
                    read_back || more_in_set || more_sets,
                ));
                if let Some(read_command) = read_command {
                    batches.push(ModificationCommandBatch::single(
                        read_command,
                        BatchRole::ReadBack,
                        more_in_set || more_sets,
                    ));
                }
            }
        }

        crate::glacier_sql!(self.log_sql, batches = batches.len(), sets = set_count, "Prepared command batches");
        Ok(batches)
    }
}
