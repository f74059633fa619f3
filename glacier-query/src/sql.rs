//! SQL text helpers shared by every generator.

use std::fmt::Write;

use glacier_types::quote_string;

/// Identifier, literal and placeholder formatting for Snowflake.
///
/// Identifiers are always delimited so that mixed-case model names survive
/// Snowflake's upper-casing of bare identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlGenerationHelper {
    parameter_prefix: String,
    max_identifier_length: usize,
}

impl SqlGenerationHelper {
    /// Create a helper with `:` placeholders and 255-character identifiers.
    pub fn new() -> Self {
        Self {
            parameter_prefix: ":".to_string(),
            max_identifier_length: 255,
        }
    }

    /// Create a helper from loaded configuration.
    pub fn from_config(config: &crate::config::GlacierConfig) -> Self {
        Self {
            parameter_prefix: config.query.parameter_prefix.clone(),
            max_identifier_length: config.dialect.max_identifier_length,
        }
    }

    /// Statement terminator.
    pub fn statement_terminator(&self) -> &'static str {
        ";"
    }

    /// Maximum identifier length.
    pub fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    /// Delimit an identifier, doubling embedded quotes.
    pub fn delimit_identifier(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_identifier(&mut out, name);
        out
    }

    /// Delimit a schema-qualified identifier.
    pub fn delimit_qualified(&self, name: &str, schema: Option<&str>) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        self.write_qualified(&mut out, name, schema);
        out
    }

    /// Write a delimited identifier to a buffer.
    pub fn write_identifier(&self, buffer: &mut String, name: &str) {
        buffer.push('"');
        for c in name.chars() {
            if c == '"' {
                buffer.push('"');
            }
            buffer.push(c);
        }
        buffer.push('"');
    }

    /// Write a schema-qualified identifier to a buffer.
    pub fn write_qualified(&self, buffer: &mut String, name: &str, schema: Option<&str>) {
        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            self.write_identifier(buffer, schema);
            buffer.push('.');
        }
        self.write_identifier(buffer, name);
    }

    /// The placeholder for a parameter name, e.g. `:p0`.
    pub fn parameter_placeholder(&self, name: &str) -> String {
        format!("{}{}", self.parameter_prefix, name)
    }

    /// A quoted string literal.
    pub fn string_literal(&self, text: &str) -> String {
        quote_string(text)
    }

    /// Cut an identifier to the maximum length on a character boundary.
    pub fn truncate_identifier<'a>(&self, name: &'a str) -> &'a str {
        match name.char_indices().nth(self.max_identifier_length) {
            Some((end, _)) => &name[..end],
            None => name,
        }
    }

    /// Write `ALTER TABLE <table> ` to a buffer.
    pub fn write_alter_table(&self, buffer: &mut String, table: &str, schema: Option<&str>) {
        buffer.push_str("ALTER TABLE ");
        self.write_qualified(buffer, table, schema);
        buffer.push(' ');
    }

    /// Join delimited identifiers with `, `.
    pub fn column_list<S: AsRef<str>>(&self, columns: &[S]) -> String {
        let mut out = String::new();
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_identifier(&mut out, column.as_ref());
        }
        out
    }
}

impl Default for SqlGenerationHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates `p0`, `p1`, ... parameter names within one statement.
#[derive(Debug, Clone, Default)]
pub struct ParameterNameGenerator {
    next: usize,
}

impl ParameterNameGenerator {
    /// Create a generator starting at `p0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next name.
    pub fn generate_next(&mut self) -> String {
        let mut name = String::with_capacity(4);
        let _ = write!(name, "p{}", self.next);
        self.next += 1;
        name
    }

    /// Start again from `p0`.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delimit_identifier() {
        let helper = SqlGenerationHelper::new();
        assert_eq!(helper.delimit_identifier("Orders"), "\"Orders\"");
        assert_eq!(helper.delimit_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_delimit_qualified() {
        let helper = SqlGenerationHelper::new();
        assert_eq!(
            helper.delimit_qualified("Orders", Some("SALES")),
            "\"SALES\".\"Orders\""
        );
        assert_eq!(helper.delimit_qualified("Orders", None), "\"Orders\"");
        assert_eq!(helper.delimit_qualified("Orders", Some("")), "\"Orders\"");
    }

    #[test]
    fn test_placeholder() {
        let helper = SqlGenerationHelper::new();
        assert_eq!(helper.parameter_placeholder("p3"), ":p3");
    }

    #[test]
    fn test_column_list() {
        let helper = SqlGenerationHelper::new();
        assert_eq!(helper.column_list(&["Id", "Name"]), "\"Id\", \"Name\"");
    }

    #[test]
    fn test_truncate_identifier() {
        let mut config = crate::config::GlacierConfig::default();
        config.dialect.max_identifier_length = 4;
        let helper = SqlGenerationHelper::from_config(&config);
        assert_eq!(helper.truncate_identifier("IX_Orders"), "IX_O");
        assert_eq!(helper.truncate_identifier("Id"), "Id");
    }

    #[test]
    fn test_parameter_name_generator_reset() {
        let mut names = ParameterNameGenerator::new();
        assert_eq!(names.generate_next(), "p0");
        assert_eq!(names.generate_next(), "p1");
        names.reset();
        assert_eq!(names.generate_next(), "p0");
    }
}
