//! Dialect annotations exposed on model elements.
//!
//! Two views exist. The design-time view carries everything a migration
//! snapshot needs to reproduce the model; the runtime view carries only what
//! the update and query pipeline reads. Each view builds its own set.

use std::fmt;

use smol_str::SmolStr;

use crate::model::{ColumnModel, SequenceModel, TableModel};
use crate::operation::TableKind;

/// Prefix of every annotation this crate emits.
pub const ANNOTATION_PREFIX: &str = "Snowflake:";

/// Annotation names.
pub mod names {
    pub const IDENTITY: &str = "Snowflake:Identity";
    pub const IDENTITY_SEED: &str = "Snowflake:IdentitySeed";
    pub const IDENTITY_INCREMENT: &str = "Snowflake:IdentityIncrement";
    pub const IDENTITY_ORDER: &str = "Snowflake:IdentityOrder";
    pub const SEQUENCE_ORDER: &str = "Snowflake:SequenceOrder";
    pub const TABLE_KIND: &str = "Snowflake:TableKind";
}

/// An annotation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Text(SmolStr),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: &'static str,
    pub value: AnnotationValue,
}

impl Annotation {
    fn new(name: &'static str, value: AnnotationValue) -> Self {
        Self { name, value }
    }

    fn table_kind(kind: TableKind) -> Self {
        Self::new(names::TABLE_KIND, AnnotationValue::Text(SmolStr::new(kind.as_str())))
    }
}

/// Which annotations a model element exposes.
pub trait AnnotationView {
    fn table(&self, table: &TableModel) -> Vec<Annotation>;
    fn column(&self, column: &ColumnModel) -> Vec<Annotation>;
    fn sequence(&self, sequence: &SequenceModel) -> Vec<Annotation>;
}

/// Annotations the update and query pipeline reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeView;

impl AnnotationView for RuntimeView {
    fn table(&self, table: &TableModel) -> Vec<Annotation> {
        // Permanent is assumed when absent.
        if table.kind == TableKind::Permanent {
            Vec::new()
        } else {
            vec![Annotation::table_kind(table.kind)]
        }
    }

    fn column(&self, column: &ColumnModel) -> Vec<Annotation> {
        if column.identity.is_some() {
            vec![Annotation::new(names::IDENTITY, AnnotationValue::Bool(true))]
        } else {
            Vec::new()
        }
    }

    fn sequence(&self, _sequence: &SequenceModel) -> Vec<Annotation> {
        Vec::new()
    }
}

/// Annotations a migration snapshot records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignTimeView;

impl AnnotationView for DesignTimeView {
    fn table(&self, table: &TableModel) -> Vec<Annotation> {
        vec![Annotation::table_kind(table.kind)]
    }

    fn column(&self, column: &ColumnModel) -> Vec<Annotation> {
        let Some(identity) = column.identity else {
            return Vec::new();
        };
        vec![
            Annotation::new(names::IDENTITY_SEED, AnnotationValue::Int(identity.start)),
            Annotation::new(names::IDENTITY_INCREMENT, AnnotationValue::Int(identity.increment)),
            Annotation::new(names::IDENTITY_ORDER, AnnotationValue::Bool(identity.ordered)),
        ]
    }

    fn sequence(&self, sequence: &SequenceModel) -> Vec<Annotation> {
        vec![Annotation::new(
            names::SEQUENCE_ORDER,
            AnnotationValue::Bool(sequence.ordered),
        )]
    }
}
