//! The SQL expression tree handed over by the host query compiler.
//!
//! Nodes are built upstream, already bound to type mappings where the host
//! knows them. This layer only reads the tree: the translator builds new
//! nodes out of existing ones, and the generator renders them.
//!
//! ```rust
//! use glacier_query::expr::{SelectExpression, SqlExpression, TableSource};
//! use glacier_query::SortOrder;
//!
//! let select = SelectExpression::new()
//!     .from(TableSource::table("Orders", "o"))
//!     .project(SqlExpression::column("Id").of("o"), None)
//!     .filter(SqlExpression::column("Total").of("o").greater_than(SqlExpression::constant(100)))
//!     .order_by(SqlExpression::column("Id").of("o"), SortOrder::Desc);
//!
//! assert_eq!(select.orderings.len(), 1);
//! ```

use glacier_types::{MappingKind, StoreValue, TypeMapping};
use smol_str::SmolStr;

use crate::pagination::Pagination;
use crate::types::SortOrder;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::OrElse => 1,
            Self::AndAlso => 2,
            Self::Equal
            | Self::NotEqual
            | Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            // rendered as function calls
            Self::BitwiseAnd | Self::BitwiseOr | Self::BitwiseXor => 9,
        }
    }

    /// Whether `a op (b op c)` equals `(a op b) op c`.
    pub(crate) fn is_associative(&self) -> bool {
        matches!(
            self,
            Self::AndAlso | Self::OrElse | Self::Add | Self::Multiply
        )
    }

    /// Whether the operator yields a boolean.
    pub fn is_predicate(&self) -> bool {
        self.precedence() <= 4
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `NOT (operand)`
    Not,
    /// Arithmetic negation. Anything but a column is parenthesized.
    Negate,
    /// `operand IS NULL`
    IsNull,
    /// `operand IS NOT NULL`
    IsNotNull,
}

/// Wildcard placement for pattern-matching translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeAffix {
    /// `pattern%`
    StartsWith,
    /// `%pattern`
    EndsWith,
    /// `%pattern%`
    Contains,
}

impl LikeAffix {
    /// Suffix used when naming a derived parameter.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Contains => "contains",
        }
    }

    /// Escape `value` and add the wildcards. An empty value matches everything.
    pub fn apply(&self, value: &str, escape: char) -> String {
        if value.is_empty() {
            return "%".to_string();
        }
        let escaped = escape_like(value, escape);
        match self {
            Self::StartsWith => format!("{}%", escaped),
            Self::EndsWith => format!("%{}", escaped),
            Self::Contains => format!("%{}%", escaped),
        }
    }
}

/// Prefix `%`, `_` and the escape character itself with the escape character.
pub fn escape_like(value: &str, escape: char) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if c == '%' || c == '_' || c == escape {
            out.push(escape);
        }
        out.push(c);
    }
    out
}

/// How a parameter's value is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// Extracted by the host from a captured value. May be merged with an identical slot.
    Anonymous,
    /// Declared by the user (raw SQL arguments). Never merged.
    User,
    /// Computed at execution time from another parameter's value.
    Derived {
        /// Host name of the parameter the value is computed from.
        source: SmolStr,
        /// The pattern transform.
        affix: LikeAffix,
        /// LIKE escape character.
        escape: char,
    },
}

/// One `WHEN ... THEN ...` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    /// The condition, or the value compared against the operand of a simple CASE.
    pub test: SqlExpression,
    pub result: SqlExpression,
}

/// A SQL expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpression {
    /// A column reference, optionally qualified by a table alias.
    Column {
        name: SmolStr,
        /// Table alias the column is qualified with.
        table: Option<SmolStr>,
        type_mapping: Option<TypeMapping>,
        /// Whether the column may hold NULL.
        nullable: bool,
    },
    /// An inline literal.
    Constant {
        value: StoreValue,
        /// Mapping used to format the literal. Inferred from the value when absent.
        type_mapping: Option<TypeMapping>,
    },
    /// A bound parameter, rendered as a placeholder.
    Parameter {
        /// Host-side name. The SQL name is assigned when rendering.
        name: SmolStr,
        kind: ParameterKind,
        type_mapping: Option<TypeMapping>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<SqlExpression>,
        right: Box<SqlExpression>,
        /// Result type, if known.
        type_mapping: Option<TypeMapping>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<SqlExpression>,
    },
    /// A function call `name(arguments)`.
    Function {
        name: SmolStr,
        arguments: Vec<SqlExpression>,
        /// Result type, if known.
        type_mapping: Option<TypeMapping>,
    },
    /// `match_expr LIKE pattern [ESCAPE 'c']`.
    Like {
        match_expr: Box<SqlExpression>,
        pattern: Box<SqlExpression>,
        /// Escape character, written as an `ESCAPE` clause when present.
        escape: Option<char>,
        /// Render as `NOT LIKE`.
        negated: bool,
    },
    /// `CAST(operand AS store_type)`.
    Cast {
        operand: Box<SqlExpression>,
        /// Target type.
        type_mapping: TypeMapping,
    },
    /// A searched CASE, or a simple CASE when `operand` is set.
    Case {
        operand: Option<Box<SqlExpression>>,
        when_clauses: Vec<CaseWhen>,
        else_result: Option<Box<SqlExpression>>,
    },
    /// `operand IN (values)`. An empty list renders as `FALSE`, or `TRUE` when negated.
    In {
        operand: Box<SqlExpression>,
        values: Vec<SqlExpression>,
        /// Render as `NOT IN`.
        negated: bool,
    },
    /// `EXISTS (subquery)`.
    Exists {
        subquery: Box<SelectExpression>,
        /// Render as `NOT EXISTS`.
        negated: bool,
    },
    /// A scalar subquery.
    Scalar(Box<SelectExpression>),
    /// Raw SQL text.
    Fragment(String),
}

impl SqlExpression {
    // ============== Constructors ==============

    /// A nullable column without a known table alias.
    pub fn column(name: impl Into<SmolStr>) -> Self {
        Self::Column {
            name: name.into(),
            table: None,
            type_mapping: None,
            nullable: true,
        }
    }

    /// A constant.
    pub fn constant(value: impl Into<StoreValue>) -> Self {
        Self::Constant {
            value: value.into(),
            type_mapping: None,
        }
    }

    /// A null constant.
    pub fn null() -> Self {
        Self::constant(StoreValue::Null)
    }

    /// An anonymous parameter.
    pub fn parameter(name: impl Into<SmolStr>) -> Self {
        Self::Parameter {
            name: name.into(),
            kind: ParameterKind::Anonymous,
            type_mapping: None,
        }
    }

    /// A user-declared parameter.
    pub fn user_parameter(name: impl Into<SmolStr>) -> Self {
        Self::Parameter {
            name: name.into(),
            kind: ParameterKind::User,
            type_mapping: None,
        }
    }

    /// A binary expression.
    pub fn binary(op: BinaryOperator, left: SqlExpression, right: SqlExpression) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            type_mapping: None,
        }
    }

    /// A function call.
    pub fn function(name: impl Into<SmolStr>, arguments: Vec<SqlExpression>) -> Self {
        Self::Function {
            name: name.into(),
            arguments,
            type_mapping: None,
        }
    }

    /// `CAST(operand AS type)`.
    pub fn cast(operand: SqlExpression, type_mapping: TypeMapping) -> Self {
        Self::Cast {
            operand: Box::new(operand),
            type_mapping,
        }
    }

    /// `operand LIKE pattern [ESCAPE 'c']`.
    pub fn like(operand: SqlExpression, pattern: SqlExpression, escape: Option<char>) -> Self {
        Self::Like {
            match_expr: Box::new(operand),
            pattern: Box::new(pattern),
            escape,
            negated: false,
        }
    }

    /// `operand IN (values)`.
    pub fn in_list(operand: SqlExpression, values: Vec<SqlExpression>) -> Self {
        Self::In {
            operand: Box::new(operand),
            values,
            negated: false,
        }
    }

    /// `EXISTS (subquery)`.
    pub fn exists(subquery: SelectExpression) -> Self {
        Self::Exists {
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    /// A searched `CASE`.
    pub fn case(when_clauses: Vec<CaseWhen>, else_result: Option<SqlExpression>) -> Self {
        Self::Case {
            operand: None,
            when_clauses,
            else_result: else_result.map(Box::new),
        }
    }

    /// Raw SQL text.
    pub fn fragment(sql: impl Into<String>) -> Self {
        Self::Fragment(sql.into())
    }

    // ============== Combinators ==============

    /// Qualify a column with a table alias.
    pub fn of(self, table: impl Into<SmolStr>) -> Self {
        match self {
            Self::Column {
                name,
                type_mapping,
                nullable,
                ..
            } => Self::Column {
                name,
                table: Some(table.into()),
                type_mapping,
                nullable,
            },
            other => other,
        }
    }

    /// Mark a column as non-nullable.
    pub fn not_null(self) -> Self {
        match self {
            Self::Column {
                name,
                table,
                type_mapping,
                ..
            } => Self::Column {
                name,
                table,
                type_mapping,
                nullable: false,
            },
            other => other,
        }
    }

    /// Attach a type mapping. Nodes with a fixed boolean type are returned unchanged.
    pub fn with_type_mapping(mut self, mapping: TypeMapping) -> Self {
        match &mut self {
            Self::Column { type_mapping, .. }
            | Self::Constant { type_mapping, .. }
            | Self::Parameter { type_mapping, .. }
            | Self::Binary { type_mapping, .. }
            | Self::Function { type_mapping, .. } => *type_mapping = Some(mapping),
            Self::Cast { type_mapping, .. } => *type_mapping = mapping,
            _ => {}
        }
        self
    }

    /// `self AND other`.
    pub fn and(self, other: SqlExpression) -> Self {
        Self::binary(BinaryOperator::AndAlso, self, other)
    }

    /// `self OR other`.
    pub fn or(self, other: SqlExpression) -> Self {
        Self::binary(BinaryOperator::OrElse, self, other)
    }

    /// `self = other`.
    pub fn equal(self, other: SqlExpression) -> Self {
        Self::binary(BinaryOperator::Equal, self, other)
    }

    /// `self > other`.
    pub fn greater_than(self, other: SqlExpression) -> Self {
        Self::binary(BinaryOperator::GreaterThan, self, other)
    }

    /// `self + other`.
    pub fn plus(self, other: SqlExpression) -> Self {
        Self::binary(BinaryOperator::Add, self, other)
    }

    /// `NOT self`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOperator::Not,
            operand: Box::new(self),
        }
    }

    /// Arithmetic negation, `-self`.
    pub fn negate(self) -> Self {
        Self::Unary {
            op: UnaryOperator::Negate,
            operand: Box::new(self),
        }
    }

    /// `self IS NULL`.
    pub fn is_null(self) -> Self {
        Self::Unary {
            op: UnaryOperator::IsNull,
            operand: Box::new(self),
        }
    }

    /// `self IS NOT NULL`.
    pub fn is_not_null(self) -> Self {
        Self::Unary {
            op: UnaryOperator::IsNotNull,
            operand: Box::new(self),
        }
    }

    // ============== Inspection ==============

    /// The type mapping of the node's value, if known.
    ///
    /// Arithmetic without an explicit mapping takes the mapping of its operands.
    pub fn type_mapping(&self) -> Option<&TypeMapping> {
        match self {
            Self::Column { type_mapping, .. }
            | Self::Constant { type_mapping, .. }
            | Self::Parameter { type_mapping, .. }
            | Self::Function { type_mapping, .. } => type_mapping.as_ref(),
            Self::Binary {
                op,
                left,
                right,
                type_mapping,
            } => type_mapping.as_ref().or_else(|| {
                if op.is_predicate() {
                    None
                } else {
                    left.type_mapping().or_else(|| right.type_mapping())
                }
            }),
            Self::Cast { type_mapping, .. } => Some(type_mapping),
            Self::Unary {
                op: UnaryOperator::Negate,
                operand,
            } => operand.type_mapping(),
            Self::Case {
                when_clauses,
                else_result,
                ..
            } => when_clauses
                .iter()
                .find_map(|w| w.result.type_mapping())
                .or_else(|| else_result.as_deref().and_then(|e| e.type_mapping())),
            _ => None,
        }
    }

    /// Whether the node's value is text.
    pub fn is_text(&self) -> bool {
        match self {
            Self::Constant {
                value: StoreValue::String(_),
                type_mapping: None,
            } => true,
            _ => self
                .type_mapping()
                .is_some_and(|m| m.kind() == MappingKind::Text),
        }
    }

    /// Whether the node is a constant null.
    pub fn is_null_constant(&self) -> bool {
        matches!(self, Self::Constant { value, .. } if value.is_null())
    }
}

/// A table, subquery or join in the `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table {
        name: SmolStr,
        schema: Option<SmolStr>,
        alias: SmolStr,
    },
    Subquery {
        query: Box<SelectExpression>,
        alias: SmolStr,
    },
    InnerJoin {
        source: Box<TableSource>,
        on: SqlExpression,
    },
    LeftJoin {
        source: Box<TableSource>,
        on: SqlExpression,
    },
    CrossJoin(Box<TableSource>),
    /// Correlated join keeping only matched rows.
    CrossApply(Box<TableSource>),
    /// Correlated join keeping unmatched outer rows.
    OuterApply(Box<TableSource>),
}

impl TableSource {
    /// A table in the default schema.
    pub fn table(name: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Self {
        Self::Table {
            name: name.into(),
            schema: None,
            alias: alias.into(),
        }
    }

    /// A schema-qualified table.
    pub fn table_in(
        schema: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        alias: impl Into<SmolStr>,
    ) -> Self {
        Self::Table {
            name: name.into(),
            schema: Some(schema.into()),
            alias: alias.into(),
        }
    }

    /// A derived table.
    pub fn subquery(query: SelectExpression, alias: impl Into<SmolStr>) -> Self {
        Self::Subquery {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// Inner join this source.
    pub fn inner_join(self, on: SqlExpression) -> Self {
        Self::InnerJoin {
            source: Box::new(self),
            on,
        }
    }

    /// Left join this source.
    pub fn left_join(self, on: SqlExpression) -> Self {
        Self::LeftJoin {
            source: Box::new(self),
            on,
        }
    }

    /// Cross apply this source.
    pub fn cross_apply(self) -> Self {
        Self::CrossApply(Box::new(self))
    }

    /// Outer apply this source.
    pub fn outer_apply(self) -> Self {
        Self::OuterApply(Box::new(self))
    }
}

/// One `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expression: SqlExpression,
    pub order: SortOrder,
}

/// One projected column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub expression: SqlExpression,
    pub alias: Option<SmolStr>,
}

/// A `SELECT` statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectExpression {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    /// The first entry is the `FROM` source; the rest are joins.
    pub tables: Vec<TableSource>,
    pub predicate: Option<SqlExpression>,
    pub group_by: Vec<SqlExpression>,
    pub having: Option<SqlExpression>,
    pub orderings: Vec<Ordering>,
    pub limit: Option<SqlExpression>,
    pub offset: Option<SqlExpression>,
}

impl SelectExpression {
    /// Create an empty select.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table source.
    pub fn from(mut self, source: TableSource) -> Self {
        self.tables.push(source);
        self
    }

    /// Add a join; same as [`SelectExpression::from`] after the first source.
    pub fn join(self, source: TableSource) -> Self {
        self.from(source)
    }

    /// Project an expression.
    pub fn project(mut self, expression: SqlExpression, alias: Option<&str>) -> Self {
        self.projection.push(Projection {
            expression,
            alias: alias.map(SmolStr::new),
        });
        self
    }

    /// Add a predicate, combined with `AND` with any existing one.
    pub fn filter(mut self, predicate: SqlExpression) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Add an ordering.
    pub fn order_by(mut self, expression: SqlExpression, order: SortOrder) -> Self {
        self.orderings.push(Ordering { expression, order });
        self
    }

    /// Add a grouping key.
    pub fn group_by(mut self, expression: SqlExpression) -> Self {
        self.group_by.push(expression);
        self
    }

    /// Set the `HAVING` predicate.
    pub fn having(mut self, predicate: SqlExpression) -> Self {
        self.having = Some(predicate);
        self
    }

    /// Select distinct rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: SqlExpression) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset.
    pub fn offset(mut self, offset: SqlExpression) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Apply constant paging.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        if let Some(skip) = pagination.skip {
            self.offset = Some(SqlExpression::constant(skip));
        }
        if let Some(take) = pagination.take {
            self.limit = Some(SqlExpression::constant(take));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glacier_types::TypeMappingSource;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%", '\\'), "50\\%");
        assert_eq!(escape_like("a_b\\c", '\\'), "a\\_b\\\\c");
        assert_eq!(escape_like("plain", '\\'), "plain");
    }

    #[test]
    fn test_like_affix() {
        assert_eq!(LikeAffix::StartsWith.apply("50%", '\\'), "50\\%%");
        assert_eq!(LikeAffix::EndsWith.apply("x", '\\'), "%x");
        assert_eq!(LikeAffix::Contains.apply("x", '\\'), "%x%");
        assert_eq!(LikeAffix::Contains.apply("", '\\'), "%");
    }

    #[test]
    fn test_arithmetic_inherits_type_mapping() {
        let text = TypeMappingSource::shared().find_store_type("VARCHAR(10)").unwrap();
        let expr = SqlExpression::column("First")
            .with_type_mapping(text)
            .plus(SqlExpression::column("Last"));
        assert!(expr.is_text());

        let predicate = SqlExpression::column("A").equal(SqlExpression::constant("x"));
        assert!(predicate.type_mapping().is_none());
    }

    #[test]
    fn test_filter_combines_with_and() {
        let select = SelectExpression::new()
            .filter(SqlExpression::column("A").is_null())
            .filter(SqlExpression::column("B").is_null());
        assert!(matches!(
            select.predicate,
            Some(SqlExpression::Binary {
                op: BinaryOperator::AndAlso,
                ..
            })
        ));
    }

    #[test]
    fn test_paginate() {
        let select = SelectExpression::new().paginate(Pagination::page(2, 10));
        assert_eq!(select.offset, Some(SqlExpression::constant(10u64)));
        assert_eq!(select.limit, Some(SqlExpression::constant(10u64)));
    }
}
