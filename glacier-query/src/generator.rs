//! Query text generation.
//!
//! [`QuerySqlGenerator`] renders a bound [`SelectExpression`] into Snowflake
//! SQL plus the parameter plan for its placeholders. Rendering state lives in
//! a value created per call, so one generator can be shared.
//!
//! ```rust
//! use glacier_query::expr::{SelectExpression, SqlExpression, TableSource};
//! use glacier_query::{QuerySqlGenerator, SortOrder};
//!
//! let select = SelectExpression::new()
//!     .from(TableSource::table("Orders", "o"))
//!     .project(SqlExpression::column("Id").of("o"), None)
//!     .order_by(SqlExpression::column("Placed").of("o"), SortOrder::Desc)
//!     .limit(SqlExpression::constant(10));
//!
//! let rendered = QuerySqlGenerator::new().render(&select).unwrap();
//! assert_eq!(
//!     rendered.sql,
//!     "SELECT \"o\".\"Id\" FROM \"Orders\" AS \"o\" ORDER BY \"o\".\"Placed\" DESC NULLS LAST FETCH FIRST 10 ROWS ONLY"
//! );
//! ```

use glacier_types::{StoreValue, TypeMapping, TypeMappingSource};
use tracing::debug;

use crate::config::GlacierConfig;
use crate::error::{QueryError, QueryResult};
use crate::expr::{
    BinaryOperator, ParameterKind, SelectExpression, SqlExpression, TableSource, UnaryOperator,
};
use crate::pagination::write_paging;
use crate::params::{ParameterPlan, ParameterRegistry};
use crate::sql::SqlGenerationHelper;

/// Rendered SQL and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// The SQL text.
    pub sql: String,
    /// Parameter slots in placeholder order.
    pub parameters: ParameterPlan,
}

/// Renders select expressions as Snowflake SQL.
#[derive(Debug, Clone)]
pub struct QuerySqlGenerator {
    helper: SqlGenerationHelper,
    types: &'static TypeMappingSource,
    log_sql: bool,
}

impl QuerySqlGenerator {
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

    /// Render a select statement.
    pub fn render(&self, select: &SelectExpression) -> QueryResult<RenderedQuery> {
        let mut state = RenderState::new(self);
        state.select(select)?;
        let rendered = state.finish();
        crate::glacier_sql!(
            self.log_sql,
            sql = %rendered.sql,
            parameters = rendered.parameters.len(),
            "Rendered query"
        );
        Ok(rendered)
    }

    /// Render a standalone expression (predicates, projections).
    pub fn render_expression(&self, expression: &SqlExpression) -> QueryResult<RenderedQuery> {
        let mut state = RenderState::new(self);
        state.expression(expression)?;
        Ok(state.finish())
    }
}

impl Default for QuerySqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Precedence for parenthesization; higher binds tighter.
fn precedence(expression: &SqlExpression) -> u8 {
    match expression {
        SqlExpression::Binary { op, .. } => op.precedence(),
        SqlExpression::Like { .. } | SqlExpression::In { .. } => 4,
        SqlExpression::Unary { op, .. } => match op {
            UnaryOperator::Not => 3,
            UnaryOperator::IsNull | UnaryOperator::IsNotNull => 4,
            UnaryOperator::Negate => 7,
        },
        _ => 10,
    }
}

struct RenderState<'g> {
    generator: &'g QuerySqlGenerator,
    sql: String,
    registry: ParameterRegistry,
}

impl<'g> RenderState<'g> {
    fn new(generator: &'g QuerySqlGenerator) -> Self {
        Self {
            generator,
            sql: String::with_capacity(256),
            registry: ParameterRegistry::new(),
        }
    }

    fn finish(self) -> RenderedQuery {
        RenderedQuery {
            sql: self.sql,
            parameters: self.registry.into_plan(),
        }
    }

    fn helper(&self) -> &'g SqlGenerationHelper {
        &self.generator.helper
    }

    fn select(&mut self, select: &SelectExpression) -> QueryResult<()> {
        self.sql.push_str("SELECT ");
        if select.distinct {
            self.sql.push_str("DISTINCT ");
        }

        if select.projection.is_empty() {
            self.sql.push('1');
        }
        for (i, projection) in select.projection.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.expression(&projection.expression)?;
            if let Some(alias) = &projection.alias {
                let redundant = matches!(
                    &projection.expression,
                    SqlExpression::Column { name, .. } if name == alias
                );
                if !redundant {
                    self.sql.push_str(" AS ");
                    self.helper().write_identifier(&mut self.sql, alias);
                }
            }
        }

        let mut tables = select.tables.iter();
        if let Some(first) = tables.next() {
            self.sql.push_str(" FROM ");
            self.source(first)?;
            for join in tables {
                self.sql.push(' ');
                self.join(join)?;
            }
        }

        if let Some(predicate) = &select.predicate {
            self.sql.push_str(" WHERE ");
            self.expression(predicate)?;
        }

        if !select.group_by.is_empty() {
            self.sql.push_str(" GROUP BY ");
            self.list(&select.group_by)?;
        }

        if let Some(having) = &select.having {
            self.sql.push_str(" HAVING ");
            self.expression(having)?;
        }

        if !select.orderings.is_empty() {
            self.sql.push_str(" ORDER BY ");
            for (i, ordering) in select.orderings.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.expression(&ordering.expression)?;
                self.sql.push(' ');
                self.sql.push_str(ordering.order.as_sql());
                self.sql.push(' ');
                self.sql.push_str(ordering.order.nulls().as_sql());
            }
        }

        if select.offset.is_some() || select.limit.is_some() {
            let offset = select
                .offset
                .as_ref()
                .map(|e| self.detached(e))
                .transpose()?;
            let limit = select
                .limit
                .as_ref()
                .map(|e| self.detached(e))
                .transpose()?;
            self.sql.push(' ');
            write_paging(&mut self.sql, offset.as_deref(), limit.as_deref());
        }

        Ok(())
    }

    /// Render into a separate string, keeping parameter registration shared.
    fn detached(&mut self, expression: &SqlExpression) -> QueryResult<String> {
        let saved = std::mem::take(&mut self.sql);
        let result = self.expression(expression);
        let rendered = std::mem::replace(&mut self.sql, saved);
        result.map(|_| rendered)
    }

    fn source(&mut self, source: &TableSource) -> QueryResult<()> {
        match source {
            TableSource::Table {
                name,
                schema,
                alias,
            } => {
                let helper = self.helper();
                helper.write_qualified(&mut self.sql, name, schema.as_deref());
                self.sql.push_str(" AS ");
                helper.write_identifier(&mut self.sql, alias);
                Ok(())
            }
            TableSource::Subquery { query, alias } => {
                self.sql.push('(');
                self.select(query)?;
                self.sql.push_str(") AS ");
                self.helper().write_identifier(&mut self.sql, alias);
                Ok(())
            }
            _ => Err(QueryError::invalid_select(
                "The first table source must be a table or subquery, not a join",
            )),
        }
    }

    fn join(&mut self, join: &TableSource) -> QueryResult<()> {
        match join {
            TableSource::Table { .. } | TableSource::Subquery { .. } => {
                self.sql.push_str("CROSS JOIN ");
                self.source(join)
            }
            TableSource::InnerJoin { source, on } => {
                self.sql.push_str("INNER JOIN ");
                self.source(source)?;
                self.sql.push_str(" ON ");
                self.expression(on)
            }
            TableSource::LeftJoin { source, on } => {
                self.sql.push_str("LEFT JOIN ");
                self.source(source)?;
                self.sql.push_str(" ON ");
                self.expression(on)
            }
            TableSource::CrossJoin(source) => {
                self.sql.push_str("CROSS JOIN ");
                self.source(source)
            }
            TableSource::CrossApply(source) => {
                self.sql.push_str("INNER JOIN LATERAL ");
                self.source(source)?;
                self.sql.push_str(" ON TRUE");
                Ok(())
            }
            TableSource::OuterApply(_) => Err(QueryError::unsupported_query("OUTER APPLY")
                .with_suggestion("Request a split query so the collection is loaded separately")
                .with_help("Snowflake has no outer lateral join that preserves unmatched rows here")),
        }
    }

    fn list(&mut self, expressions: &[SqlExpression]) -> QueryResult<()> {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.expression(expression)?;
        }
        Ok(())
    }

    fn expression(&mut self, expression: &SqlExpression) -> QueryResult<()> {
        match expression {
            SqlExpression::Column { name, table, .. } => {
                let helper = self.helper();
                if let Some(table) = table {
                    helper.write_identifier(&mut self.sql, table);
                    self.sql.push('.');
                }
                helper.write_identifier(&mut self.sql, name);
            }
            SqlExpression::Constant {
                value,
                type_mapping,
            } => self.constant(value, type_mapping.as_ref())?,
            SqlExpression::Parameter {
                name,
                kind,
                type_mapping,
            } => self.parameter(name, kind, type_mapping.as_ref()),
            SqlExpression::Binary {
                op, left, right, ..
            } => self.binary(expression, *op, left, right)?,
            SqlExpression::Unary { op, operand } => self.unary(*op, operand)?,
            SqlExpression::Function {
                name, arguments, ..
            } => {
                self.sql.push_str(name);
                self.sql.push('(');
                self.list(arguments)?;
                self.sql.push(')');
            }
            SqlExpression::Like {
                match_expr,
                pattern,
                escape,
                negated,
            } => {
                self.operand(match_expr, 4, false)?;
                self.sql.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                self.operand(pattern, 4, true)?;
                if let Some(escape) = escape {
                    self.sql.push_str(" ESCAPE ");
                    let literal = self.helper().string_literal(&escape.to_string());
                    self.sql.push_str(&literal);
                }
            }
            SqlExpression::Cast {
                operand,
                type_mapping,
            } => {
                self.sql.push_str("CAST(");
                self.expression(operand)?;
                self.sql.push_str(" AS ");
                self.sql.push_str(type_mapping.store_type());
                self.sql.push(')');
            }
            SqlExpression::Case {
                operand,
                when_clauses,
                else_result,
            } => {
                if when_clauses.is_empty() {
                    return Err(QueryError::unsupported_expression("CASE without WHEN clauses"));
                }
                self.sql.push_str("CASE");
                if let Some(operand) = operand {
                    self.sql.push(' ');
                    self.expression(operand)?;
                }
                for when in when_clauses {
                    self.sql.push_str(" WHEN ");
                    self.expression(&when.test)?;
                    self.sql.push_str(" THEN ");
                    self.expression(&when.result)?;
                }
                if let Some(else_result) = else_result {
                    self.sql.push_str(" ELSE ");
                    self.expression(else_result)?;
                }
                self.sql.push_str(" END");
            }
            SqlExpression::In {
                operand,
                values,
                negated,
            } => {
                if values.is_empty() {
                    self.sql.push_str(if *negated { "TRUE" } else { "FALSE" });
                } else {
                    self.operand(operand, 4, false)?;
                    self.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                    self.list(values)?;
                    self.sql.push(')');
                }
            }
            SqlExpression::Exists { subquery, negated } => {
                self.sql.push_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                self.select(subquery)?;
                self.sql.push(')');
            }
            SqlExpression::Scalar(subquery) => {
                self.sql.push('(');
                self.select(subquery)?;
                self.sql.push(')');
            }
            SqlExpression::Fragment(sql) => self.sql.push_str(sql),
        }
        Ok(())
    }

    fn operand(&mut self, operand: &SqlExpression, parent: u8, parenthesize_equal: bool) -> QueryResult<()> {
        let child = precedence(operand);
        if child < parent || (parenthesize_equal && child == parent) {
            self.sql.push('(');
            self.expression(operand)?;
            self.sql.push(')');
            Ok(())
        } else {
            self.expression(operand)
        }
    }

    fn binary(
        &mut self,
        node: &SqlExpression,
        op: BinaryOperator,
        left: &SqlExpression,
        right: &SqlExpression,
    ) -> QueryResult<()> {
        let function = match op {
            BinaryOperator::BitwiseAnd => Some("BITAND"),
            BinaryOperator::BitwiseOr => Some("BITOR"),
            BinaryOperator::BitwiseXor => Some("BITXOR"),
            _ => None,
        };
        if let Some(function) = function {
            self.sql.push_str(function);
            self.sql.push('(');
            self.expression(left)?;
            self.sql.push_str(", ");
            self.expression(right)?;
            self.sql.push(')');
            return Ok(());
        }

        let symbol = match op {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "AND",
            BinaryOperator::OrElse => "OR",
            BinaryOperator::Add if node.is_text() || left.is_text() || right.is_text() => "||",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitwiseAnd | BinaryOperator::BitwiseOr | BinaryOperator::BitwiseXor => {
                return Err(QueryError::internal("bitwise operator reached infix rendering"));
            }
        };

        let parent = op.precedence();
        let same_op = |e: &SqlExpression| matches!(e, SqlExpression::Binary { op: child, .. } if *child == op);
        self.operand(left, parent, false)?;
        self.sql.push(' ');
        self.sql.push_str(symbol);
        self.sql.push(' ');
        self.operand(right, parent, !(op.is_associative() && same_op(right)))
    }

    fn unary(&mut self, op: UnaryOperator, operand: &SqlExpression) -> QueryResult<()> {
        match op {
            UnaryOperator::Not => {
                self.sql.push_str("NOT (");
                self.expression(operand)?;
                self.sql.push(')');
            }
            UnaryOperator::Negate => {
                // A bare operand may itself start with `-`, and `--` opens a comment.
                self.sql.push('-');
                if matches!(operand, SqlExpression::Column { .. }) {
                    self.expression(operand)?;
                } else {
                    self.sql.push('(');
                    self.expression(operand)?;
                    self.sql.push(')');
                }
            }
            UnaryOperator::IsNull => {
                self.operand(operand, 4, true)?;
                self.sql.push_str(" IS NULL");
            }
            UnaryOperator::IsNotNull => {
                self.operand(operand, 4, true)?;
                self.sql.push_str(" IS NOT NULL");
            }
        }
        Ok(())
    }

    fn constant(&mut self, value: &StoreValue, mapping: Option<&TypeMapping>) -> QueryResult<()> {
        if value.is_null() {
            self.sql.push_str("NULL");
            return Ok(());
        }
        let literal = match mapping {
            Some(mapping) => mapping.literal(value)?,
            None => {
                let mapping = self.generator.types.find_for_value(value).ok_or_else(|| {
                    QueryError::unsupported_expression(format!("constant {:?}", value))
                })?;
                mapping.literal(value)?
            }
        };
        self.sql.push_str(&literal);
        Ok(())
    }

    fn parameter(&mut self, name: &str, kind: &ParameterKind, mapping: Option<&TypeMapping>) {
        let sql_name = self.registry.register(name, kind, mapping);
        let placeholder = self.helper().parameter_placeholder(&sql_name);
        match mapping {
            Some(mapping) => self.sql.push_str(&mapping.wrap_placeholder(&placeholder)),
            None => self.sql.push_str(&placeholder),
        }
        debug!(parameter = %sql_name, host_name = name, "Registered query parameter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::translate::{ExpressionTranslator, Method, MethodCall, Receiver, case_when};
    use crate::types::SortOrder;
    use glacier_types::LogicalType;
    use pretty_assertions::assert_eq;

    fn render(expression: &SqlExpression) -> String {
        QuerySqlGenerator::new()
            .render_expression(expression)
            .unwrap()
            .sql
    }

    fn starts_with(pattern: SqlExpression) -> SqlExpression {
        let call = MethodCall::new(Receiver::String, Method::StartsWith)
            .on(SqlExpression::column("Name").of("c"))
            .arg(pattern);
        ExpressionTranslator::new().translate(&call).unwrap()
    }

    fn text(size: u32) -> TypeMapping {
        TypeMappingSource::shared()
            .find_store_type(&format!("VARCHAR({})", size))
            .unwrap()
    }

    #[test]
    fn test_like_with_escaped_constant() {
        assert_eq!(
            render(&starts_with(SqlExpression::constant("50%"))),
            r#""c"."Name" LIKE '50\\%%' ESCAPE '\\'"#
        );
    }

    #[test]
    fn test_like_with_empty_constant() {
        assert_eq!(
            render(&starts_with(SqlExpression::constant(""))),
            r#""c"."Name" LIKE '%'"#
        );
    }

    #[test]
    fn test_like_with_null_constant() {
        assert_eq!(
            render(&starts_with(SqlExpression::null())),
            r#""c"."Name" LIKE NULL"#
        );
    }

    #[test]
    fn test_like_with_derived_parameter() {
        let rendered = QuerySqlGenerator::new()
            .render_expression(&starts_with(SqlExpression::parameter("__prefix_0")))
            .unwrap();
        assert_eq!(
            rendered.sql,
            r#""c"."Name" LIKE :__prefix_0_startswith ESCAPE '\\'"#
        );
        assert_eq!(rendered.parameters.len(), 1);
    }

    #[test]
    fn test_contains_with_column_pattern() {
        let call = MethodCall::new(Receiver::String, Method::Contains)
            .on(SqlExpression::column("Name"))
            .arg(SqlExpression::column("Part"));
        let translated = ExpressionTranslator::new().translate(&call).unwrap();
        assert_eq!(
            render(&translated),
            r#""Name" IS NOT NULL AND "Part" IS NOT NULL AND POSITION("Part", "Name") > 0"#
        );
    }

    #[test]
    fn test_starts_with_column_pattern() {
        let call = MethodCall::new(Receiver::String, Method::StartsWith)
            .on(SqlExpression::column("Name"))
            .arg(SqlExpression::column("Prefix"));
        let translated = ExpressionTranslator::new().translate(&call).unwrap();
        assert_eq!(
            render(&translated),
            r#""Name" IS NOT NULL AND "Prefix" IS NOT NULL AND LEFT("Name", LENGTH("Prefix")) = "Prefix""#
        );
    }

    #[test]
    fn test_bitwise_operators() {
        let flags = SqlExpression::column("Flags");
        let expr = SqlExpression::binary(
            BinaryOperator::BitwiseAnd,
            flags.clone(),
            SqlExpression::constant(4),
        );
        assert_eq!(render(&expr), r#"BITAND("Flags", 4)"#);

        let expr = SqlExpression::binary(BinaryOperator::BitwiseXor, flags, SqlExpression::constant(1));
        assert_eq!(render(&expr), r#"BITXOR("Flags", 1)"#);

        let both = SqlExpression::binary(
            BinaryOperator::BitwiseOr,
            SqlExpression::column("IsA"),
            SqlExpression::column("IsB"),
        );
        assert_eq!(render(&both), r#"BITOR("IsA", "IsB")"#);
    }

    #[test]
    fn test_string_concatenation() {
        let expr = SqlExpression::column("First")
            .with_type_mapping(text(20))
            .plus(SqlExpression::constant(" "))
            .plus(SqlExpression::column("Last").with_type_mapping(text(20)));
        assert_eq!(render(&expr), r#""First" || ' ' || "Last""#);

        let numbers = SqlExpression::column("A").plus(SqlExpression::constant(1));
        assert_eq!(render(&numbers), r#""A" + 1"#);
    }

    #[test]
    fn test_parenthesization() {
        let expr = SqlExpression::column("A")
            .equal(SqlExpression::constant(1))
            .or(SqlExpression::column("B").equal(SqlExpression::constant(2)))
            .and(SqlExpression::column("C").is_null());
        assert_eq!(render(&expr), r#"("A" = 1 OR "B" = 2) AND "C" IS NULL"#);

        let expr = SqlExpression::binary(
            BinaryOperator::Subtract,
            SqlExpression::column("A"),
            SqlExpression::column("B").plus(SqlExpression::column("C")),
        );
        assert_eq!(render(&expr), r#""A" - ("B" + "C")"#);
    }

    #[test]
    fn test_byte_array_index_and_length() {
        let call = MethodCall::new(Receiver::ByteArray, Method::Index)
            .on(SqlExpression::column("Payload"))
            .arg(SqlExpression::column("I"));
        let translated = ExpressionTranslator::new().translate(&call).unwrap();
        assert_eq!(
            render(&translated),
            r#"CAST(TO_NUMBER(HEX_ENCODE(SUBSTRING("Payload", "I" + 1, 1)), 'XX') AS NUMBER(3,0))"#
        );

        let call = MethodCall::new(Receiver::ByteArray, Method::Length).on(SqlExpression::column("Payload"));
        let translated = ExpressionTranslator::new().translate(&call).unwrap();
        assert_eq!(render(&translated), r#"LENGTH("Payload")"#);
    }

    #[test]
    fn test_string_functions() {
        let translator = ExpressionTranslator::new();
        let upper = translator
            .translate(&MethodCall::new(Receiver::String, Method::ToUpper).on(SqlExpression::column("Name")))
            .unwrap();
        assert_eq!(render(&upper), r#"UPPER("Name")"#);

        let empty = translator
            .translate(&MethodCall::new(Receiver::String, Method::IsNullOrEmpty).arg(SqlExpression::column("Name")))
            .unwrap();
        assert_eq!(render(&empty), r#""Name" IS NULL OR "Name" = ''"#);
    }

    #[test]
    fn test_case_cast_in_exists() {
        let case = case_when(
            [(SqlExpression::column("Qty").greater_than(SqlExpression::constant(10)), SqlExpression::constant("bulk"))],
            Some(SqlExpression::constant("single")),
        );
        assert_eq!(
            render(&case),
            r#"CASE WHEN "Qty" > 10 THEN 'bulk' ELSE 'single' END"#
        );

        let decimal = TypeMappingSource::shared()
            .find_logical(LogicalType::Decimal)
            .unwrap();
        let cast = SqlExpression::cast(SqlExpression::column("Qty"), decimal);
        assert_eq!(render(&cast), r#"CAST("Qty" AS NUMBER(38,10))"#);

        let in_list = SqlExpression::in_list(
            SqlExpression::column("Status"),
            vec![SqlExpression::constant("open"), SqlExpression::constant("held")],
        );
        assert_eq!(render(&in_list), r#""Status" IN ('open', 'held')"#);
        assert_eq!(render(&SqlExpression::in_list(SqlExpression::column("Status"), vec![])), "FALSE");

        let exists = SqlExpression::exists(
            SelectExpression::new().from(TableSource::table("Lines", "l")),
        );
        assert_eq!(render(&exists), r#"EXISTS (SELECT 1 FROM "Lines" AS "l")"#);
    }

    #[test]
    fn test_boolean_literals() {
        assert_eq!(render(&SqlExpression::constant(true)), "TRUE");
        assert_eq!(render(&SqlExpression::constant(false).not()), "NOT (FALSE)");
    }

    #[test]
    fn test_negation_never_emits_comment_marker() {
        let negative = render(&SqlExpression::constant(-1i64).negate());
        assert_eq!(negative, "-(-1)");
        assert!(!negative.contains("--"));

        let twice = render(&SqlExpression::constant(2i64).negate().negate());
        assert_eq!(twice, "-(-(2))");
        assert!(!twice.contains("--"));

        let parameter = render(&SqlExpression::parameter("delta").negate());
        assert_eq!(parameter, "-(:delta)");
        assert_eq!(render(&SqlExpression::column("Qty").negate()), r#"-"Qty""#);
    }

    #[test]
    fn test_orderings_always_place_nulls() {
        let select = SelectExpression::new()
            .from(TableSource::table("T", "t"))
            .order_by(SqlExpression::column("A").of("t"), SortOrder::Asc)
            .order_by(SqlExpression::column("B").of("t"), SortOrder::Desc);
        let sql = QuerySqlGenerator::new().render(&select).unwrap().sql;
        assert!(sql.ends_with(r#"ORDER BY "t"."A" ASC NULLS FIRST, "t"."B" DESC NULLS LAST"#));
    }

    #[test]
    fn test_paging_forms() {
        let base = || SelectExpression::new().from(TableSource::table("T", "t"));

        let sql = QuerySqlGenerator::new()
            .render(&base().offset(SqlExpression::constant(5)).limit(SqlExpression::constant(10)))
            .unwrap()
            .sql;
        assert!(sql.ends_with("OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"));

        let sql = QuerySqlGenerator::new()
            .render(&base().offset(SqlExpression::parameter("skip")))
            .unwrap()
            .sql;
        assert!(sql.ends_with("OFFSET :skip ROWS FETCH NEXT NULL ROWS ONLY"));

        let sql = QuerySqlGenerator::new()
            .render(&base().limit(SqlExpression::constant(1)))
            .unwrap()
            .sql;
        assert!(sql.ends_with("FETCH FIRST 1 ROWS ONLY"));
    }

    #[test]
    fn test_cross_apply_is_lateral_join() {
        let inner = SelectExpression::new()
            .from(TableSource::table("Lines", "l"))
            .filter(
                SqlExpression::column("OrderId")
                    .of("l")
                    .equal(SqlExpression::column("Id").of("o")),
            )
            .limit(SqlExpression::constant(1));
        let select = SelectExpression::new()
            .from(TableSource::table("Orders", "o"))
            .join(TableSource::subquery(inner, "l0").cross_apply());

        let sql = QuerySqlGenerator::new().render(&select).unwrap().sql;
        assert_eq!(
            sql,
            r#"SELECT 1 FROM "Orders" AS "o" INNER JOIN LATERAL (SELECT 1 FROM "Lines" AS "l" WHERE "l"."OrderId" = "o"."Id" FETCH FIRST 1 ROWS ONLY) AS "l0" ON TRUE"#
        );
    }

    #[test]
    fn test_outer_apply_is_rejected() {
        let select = SelectExpression::new()
            .from(TableSource::table("Orders", "o"))
            .join(TableSource::table("Lines", "l").outer_apply());
        let err = QuerySqlGenerator::new().render(&select).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedQuery);
        assert!(err.context.suggestions[0].contains("split query"));
    }

    #[test]
    fn test_parameters_deduplicated_across_query() {
        let mapping = text(10);
        let city = SqlExpression::parameter("city").with_type_mapping(mapping.clone());
        let select = SelectExpression::new()
            .from(TableSource::table("Customers", "c"))
            .filter(SqlExpression::column("City").of("c").equal(city.clone()))
            .filter(SqlExpression::column("ShipCity").of("c").equal(city))
            .filter(
                SqlExpression::column("Id")
                    .of("c")
                    .equal(SqlExpression::user_parameter("city")),
            );
        let rendered = QuerySqlGenerator::new().render(&select).unwrap();
        assert!(rendered.sql.contains(r#""c"."City" = :city AND "c"."ShipCity" = :city"#));
        assert!(rendered.sql.contains(r#""c"."Id" = :city_1"#));
        assert_eq!(rendered.parameters.len(), 2);
        assert_eq!(
            rendered.parameters.parameters()[0]
                .type_mapping()
                .map(|m| m.store_type()),
            Some("VARCHAR(10)")
        );
    }

    #[test]
    fn test_semi_structured_parameter_is_parsed() {
        let variant = TypeMappingSource::shared().find_store_type("VARIANT").unwrap();
        let expr = SqlExpression::column("Doc")
            .equal(SqlExpression::parameter("doc").with_type_mapping(variant));
        assert_eq!(render(&expr), r#""Doc" = PARSE_JSON(:doc)"#);
    }

    #[test]
    fn test_distinct_group_having() {
        let select = SelectExpression::new()
            .distinct()
            .from(TableSource::table_in("SALES", "Orders", "o"))
            .project(SqlExpression::column("Region").of("o"), Some("Region"))
            .project(
                SqlExpression::function("COUNT", vec![SqlExpression::fragment("*")]),
                Some("Total"),
            )
            .group_by(SqlExpression::column("Region").of("o"))
            .having(
                SqlExpression::function("COUNT", vec![SqlExpression::fragment("*")])
                    .greater_than(SqlExpression::constant(1)),
            );
        assert_eq!(
            QuerySqlGenerator::new().render(&select).unwrap().sql,
            r#"SELECT DISTINCT "o"."Region", COUNT(*) AS "Total" FROM "SALES"."Orders" AS "o" GROUP BY "o"."Region" HAVING COUNT(*) > 1"#
        );
    }
}
