//! Method-call translations the generic compiler cannot express for Snowflake.
//!
//! The host hands over calls it could not lower itself. A translation is
//! either a new expression or `None`, in which case the host falls back to
//! its own handling (usually client evaluation or an error).
//!
//! ```rust
//! use glacier_query::translate::{ExpressionTranslator, Method, MethodCall, Receiver};
//! use glacier_query::expr::SqlExpression;
//!
//! let translator = ExpressionTranslator::new();
//! let call = MethodCall::new(Receiver::String, Method::StartsWith)
//!     .on(SqlExpression::column("Name"))
//!     .arg(SqlExpression::constant("50%"));
//!
//! assert!(translator.translate(&call).is_some());
//! ```

use glacier_types::{LogicalType, StoreValue, TypeMapping, TypeMappingSource};
use smol_str::SmolStr;
use tracing::trace;

use crate::config::QueryConfig;
use crate::expr::{CaseWhen, LikeAffix, ParameterKind, SqlExpression};

/// The host type a method is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    String,
    ByteArray,
    Other,
}

/// The called method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    StartsWith,
    EndsWith,
    Contains,
    ToUpper,
    ToLower,
    Trim,
    Length,
    /// Static `IsNullOrEmpty(s)`.
    IsNullOrEmpty,
    /// Element access `a[i]`.
    Index,
    Other(SmolStr),
}

/// A method call or member access in the host's query.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub receiver: Receiver,
    pub method: Method,
    pub instance: Option<SqlExpression>,
    pub arguments: Vec<SqlExpression>,
}

impl MethodCall {
    /// Create a call without instance or arguments.
    pub fn new(receiver: Receiver, method: Method) -> Self {
        Self {
            receiver,
            method,
            instance: None,
            arguments: Vec::new(),
        }
    }

    /// Set the instance the method is called on.
    pub fn on(mut self, instance: SqlExpression) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Add an argument.
    pub fn arg(mut self, argument: SqlExpression) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// Translates host method calls into Snowflake expressions.
#[derive(Debug, Clone)]
pub struct ExpressionTranslator {
    types: &'static TypeMappingSource,
    escape: char,
}

impl ExpressionTranslator {
    /// Create a translator using `\` as the LIKE escape character.
    pub fn new() -> Self {
        Self {
            types: TypeMappingSource::shared(),
            escape: '\\',
        }
    }

    /// Create a translator from query configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            types: TypeMappingSource::shared(),
            escape: config.escape(),
        }
    }

    /// Translate a call, or `None` when no Snowflake-specific rule applies.
    pub fn translate(&self, call: &MethodCall) -> Option<SqlExpression> {
        let translated = match (call.receiver, &call.method) {
            (Receiver::String, Method::StartsWith) => self.pattern(call, LikeAffix::StartsWith),
            (Receiver::String, Method::EndsWith) => self.pattern(call, LikeAffix::EndsWith),
            (Receiver::String, Method::Contains) => self.pattern(call, LikeAffix::Contains),
            (Receiver::String, Method::ToUpper) => self.unary_function(call, "UPPER"),
            (Receiver::String, Method::ToLower) => self.unary_function(call, "LOWER"),
            (Receiver::String, Method::Trim) => self.unary_function(call, "TRIM"),
            (Receiver::String, Method::Length) => self.length(call),
            (Receiver::String, Method::IsNullOrEmpty) => self.is_null_or_empty(call),
            (Receiver::ByteArray, Method::Index) => self.byte_at(call),
            (Receiver::ByteArray, Method::Length) => self.length(call),
            _ => None,
        };
        if translated.is_some() {
            trace!(method = ?call.method, receiver = ?call.receiver, "Translated method call");
        }
        translated
    }

    fn pattern(&self, call: &MethodCall, affix: LikeAffix) -> Option<SqlExpression> {
        let instance = call.instance.as_ref()?;
        let [pattern] = call.arguments.as_slice() else {
            return None;
        };

        match pattern {
            SqlExpression::Constant { value, .. } => Some(self.constant_pattern(instance, value, affix)),
            SqlExpression::Parameter {
                name,
                kind: ParameterKind::Anonymous,
                type_mapping,
            } => {
                let derived = SqlExpression::Parameter {
                    name: SmolStr::new(format!("{}_{}", name, affix.name_suffix())),
                    kind: ParameterKind::Derived {
                        source: name.clone(),
                        affix,
                        escape: self.escape,
                    },
                    type_mapping: type_mapping.clone().or_else(|| instance.type_mapping().cloned()),
                };
                Some(SqlExpression::like(instance.clone(), derived, Some(self.escape)))
            }
            other => Some(self.column_pattern(instance, other, affix)),
        }
    }

    fn constant_pattern(
        &self,
        instance: &SqlExpression,
        value: &StoreValue,
        affix: LikeAffix,
    ) -> SqlExpression {
        match value {
            StoreValue::Null => SqlExpression::like(instance.clone(), SqlExpression::null(), None),
            StoreValue::String(s) if s.is_empty() => {
                SqlExpression::like(instance.clone(), SqlExpression::constant("%"), None)
            }
            other => {
                let pattern = affix.apply(&pattern_text(other), self.escape);
                SqlExpression::like(
                    instance.clone(),
                    SqlExpression::constant(pattern),
                    Some(self.escape),
                )
            }
        }
    }

    /// Patterns that are only known at run time inside the database.
    fn column_pattern(
        &self,
        instance: &SqlExpression,
        pattern: &SqlExpression,
        affix: LikeAffix,
    ) -> SqlExpression {
        let length = SqlExpression::function("LENGTH", vec![pattern.clone()]);
        let test = match affix {
            LikeAffix::StartsWith => {
                SqlExpression::function("LEFT", vec![instance.clone(), length])
                    .equal(pattern.clone())
            }
            LikeAffix::EndsWith => {
                SqlExpression::function("RIGHT", vec![instance.clone(), length])
                    .equal(pattern.clone())
            }
            LikeAffix::Contains => SqlExpression::function(
                "POSITION",
                vec![pattern.clone(), instance.clone()],
            )
            .greater_than(SqlExpression::constant(0)),
        };
        instance
            .clone()
            .is_not_null()
            .and(pattern.clone().is_not_null())
            .and(test)
    }

    fn unary_function(&self, call: &MethodCall, name: &str) -> Option<SqlExpression> {
        if !call.arguments.is_empty() {
            return None;
        }
        let instance = call.instance.clone()?;
        let mapping = instance.type_mapping().cloned();
        let function = SqlExpression::function(name, vec![instance]);
        Some(match mapping {
            Some(mapping) => function.with_type_mapping(mapping),
            None => function,
        })
    }

    fn length(&self, call: &MethodCall) -> Option<SqlExpression> {
        if !call.arguments.is_empty() {
            return None;
        }
        let instance = call.instance.clone()?;
        let function = SqlExpression::function("LENGTH", vec![instance]);
        Some(match self.types.find_logical(LogicalType::I32) {
            Some(mapping) => function.with_type_mapping(mapping),
            None => function,
        })
    }

    fn is_null_or_empty(&self, call: &MethodCall) -> Option<SqlExpression> {
        let [value] = call.arguments.as_slice() else {
            return None;
        };
        Some(
            value
                .clone()
                .is_null()
                .or(value.clone().equal(SqlExpression::constant(""))),
        )
    }

    /// `a[i]` reads one byte as its hex pair and converts it back to a number.
    fn byte_at(&self, call: &MethodCall) -> Option<SqlExpression> {
        let bytes = call.instance.clone()?;
        let [index] = call.arguments.as_slice() else {
            return None;
        };
        let element = self.byte_mapping()?;

        let one_based = index.clone().plus(SqlExpression::constant(1));
        let byte = SqlExpression::function(
            "SUBSTRING",
            vec![bytes, one_based, SqlExpression::constant(1)],
        );
        let hex = SqlExpression::function("HEX_ENCODE", vec![byte]);
        let number = SqlExpression::function("TO_NUMBER", vec![hex, SqlExpression::constant("XX")]);
        Some(SqlExpression::cast(number, element))
    }

    fn byte_mapping(&self) -> Option<TypeMapping> {
        self.types.find_logical(LogicalType::U8)
    }
}

impl Default for ExpressionTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `CASE WHEN test THEN result ... END` expression from pairs.
pub fn case_when(
    arms: impl IntoIterator<Item = (SqlExpression, SqlExpression)>,
    else_result: Option<SqlExpression>,
) -> SqlExpression {
    let when_clauses = arms
        .into_iter()
        .map(|(test, result)| CaseWhen { test, result })
        .collect();
    SqlExpression::case(when_clauses, else_result)
}

/// The text a constant compares as once Snowflake casts it to a string.
fn pattern_text(value: &StoreValue) -> String {
    match value {
        StoreValue::Null => String::new(),
        StoreValue::String(s) => s.clone(),
        StoreValue::Bool(b) => b.to_string(),
        StoreValue::Int(i) => i.to_string(),
        StoreValue::UInt(u) => u.to_string(),
        StoreValue::Float(f) => f.to_string(),
        StoreValue::Decimal(d) => d.to_string(),
        StoreValue::Bytes(bytes) => bytes.iter().map(|b| format!("{:02X}", b)).collect(),
        StoreValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        StoreValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        StoreValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        StoreValue::DateTimeOffset(dto) => dto.format("%Y-%m-%d %H:%M:%S%.f %:z").to_string(),
        StoreValue::Uuid(u) => u.hyphenated().to_string(),
        StoreValue::Json(json) => json
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| json.to_string()),
    }
}
