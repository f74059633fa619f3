//! The target model a migration moves towards.
//!
//! DDL generation only needs model-level settings from it; the tables and
//! sequences are what the annotation views read.

use glacier_query::{GlacierConfig, IndexHandling};
use smol_str::SmolStr;

use crate::operation::{IdentitySpec, TableKind};

/// A column of a table in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    pub name: SmolStr,
    pub identity: Option<IdentitySpec>,
}

impl ColumnModel {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            identity: None,
        }
    }

    pub fn identity(mut self, spec: IdentitySpec) -> Self {
        self.identity = Some(spec);
        self
    }
}

/// A table in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub name: SmolStr,
    pub schema: Option<SmolStr>,
    pub kind: TableKind,
    pub columns: Vec<ColumnModel>,
}

impl TableModel {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            kind: TableKind::Permanent,
            columns: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn column(mut self, column: ColumnModel) -> Self {
        self.columns.push(column);
        self
    }
}

/// A sequence in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceModel {
    pub name: SmolStr,
    pub schema: Option<SmolStr>,
    pub ordered: bool,
}

/// A snapshot of the model after the migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSnapshot {
    /// What to do with index operations.
    pub index_handling: IndexHandling,
    /// Schema for objects that name none.
    pub default_schema: Option<SmolStr>,
    pub tables: Vec<TableModel>,
    pub sequences: Vec<SequenceModel>,
}

impl ModelSnapshot {
    /// An empty model with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take model-level settings from configuration.
    pub fn from_config(config: &GlacierConfig) -> Self {
        Self {
            index_handling: config.dialect.index_handling,
            default_schema: config.dialect.default_schema.as_deref().map(SmolStr::new),
            ..Self::default()
        }
    }

    pub fn with_index_handling(mut self, handling: IndexHandling) -> Self {
        self.index_handling = handling;
        self
    }

    pub fn with_default_schema(mut self, schema: impl Into<SmolStr>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn table(mut self, table: TableModel) -> Self {
        self.tables.push(table);
        self
    }

    pub fn sequence(mut self, sequence: SequenceModel) -> Self {
        self.sequences.push(sequence);
        self
    }

    /// Find a table by name and schema.
    pub fn find_table(&self, name: &str, schema: Option<&str>) -> Option<&TableModel> {
        self.tables
            .iter()
            .find(|t| t.name == name && t.schema.as_deref() == schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_config() {
        let config = GlacierConfig::from_str(
            "[dialect]\nindex_handling = \"ignore\"\ndefault_schema = \"SALES\"\n",
        )
        .unwrap();
        let model = ModelSnapshot::from_config(&config);
        assert_eq!(model.index_handling, IndexHandling::Ignore);
        assert_eq!(model.default_schema.as_deref(), Some("SALES"));
    }

    #[test]
    fn test_default_disallows_indexes() {
        assert_eq!(ModelSnapshot::new().index_handling, IndexHandling::Disallow);
    }

    #[test]
    fn test_find_table() {
        let model = ModelSnapshot::new().table(TableModel::new("Orders").kind(TableKind::Hybrid));
        assert_eq!(model.find_table("Orders", None).map(|t| t.kind), Some(TableKind::Hybrid));
        assert!(model.find_table("Orders", Some("SALES")).is_none());
    }
}
