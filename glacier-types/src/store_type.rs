//! Store type name parsing and alias normalization.
//!
//! Snowflake accepts many spellings for the same physical type
//! (`STRING`, `TEXT` and `VARCHAR` are one type; `INT` is `NUMBER(38,0)`).
//! Lookups always go through the canonical spelling produced here.

use std::fmt;

use crate::facets::Facets;

/// Canonical spelling for each accepted alias.
const ALIASES: &[(&str, &str)] = &[
    ("NUMBER", "NUMBER"),
    ("DECIMAL", "NUMBER"),
    ("DEC", "NUMBER"),
    ("NUMERIC", "NUMBER"),
    ("INT", "NUMBER"),
    ("INTEGER", "NUMBER"),
    ("BIGINT", "NUMBER"),
    ("SMALLINT", "NUMBER"),
    ("TINYINT", "NUMBER"),
    ("BYTEINT", "NUMBER"),
    ("FLOAT", "FLOAT"),
    ("FLOAT4", "FLOAT"),
    ("FLOAT8", "FLOAT"),
    ("DOUBLE", "FLOAT"),
    ("DOUBLE PRECISION", "FLOAT"),
    ("REAL", "FLOAT"),
    ("VARCHAR", "VARCHAR"),
    ("STRING", "VARCHAR"),
    ("TEXT", "VARCHAR"),
    ("NVARCHAR", "VARCHAR"),
    ("NVARCHAR2", "VARCHAR"),
    ("CHAR VARYING", "VARCHAR"),
    ("NCHAR VARYING", "VARCHAR"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("CHAR", "CHAR"),
    ("CHARACTER", "CHAR"),
    ("NCHAR", "CHAR"),
    ("BINARY", "BINARY"),
    ("VARBINARY", "BINARY"),
    ("BOOLEAN", "BOOLEAN"),
    ("BOOL", "BOOLEAN"),
    ("DATE", "DATE"),
    ("TIME", "TIME"),
    ("DATETIME", "TIMESTAMP_NTZ"),
    ("TIMESTAMP", "TIMESTAMP_NTZ"),
    ("TIMESTAMP_NTZ", "TIMESTAMP_NTZ"),
    ("TIMESTAMPNTZ", "TIMESTAMP_NTZ"),
    ("TIMESTAMP WITHOUT TIME ZONE", "TIMESTAMP_NTZ"),
    ("TIMESTAMP_LTZ", "TIMESTAMP_LTZ"),
    ("TIMESTAMPLTZ", "TIMESTAMP_LTZ"),
    ("TIMESTAMP WITH LOCAL TIME ZONE", "TIMESTAMP_LTZ"),
    ("TIMESTAMP_TZ", "TIMESTAMP_TZ"),
    ("TIMESTAMPTZ", "TIMESTAMP_TZ"),
    ("TIMESTAMP WITH TIME ZONE", "TIMESTAMP_TZ"),
    ("VARIANT", "VARIANT"),
    ("OBJECT", "OBJECT"),
    ("ARRAY", "ARRAY"),
    ("GEOGRAPHY", "GEOGRAPHY"),
    ("GEOMETRY", "GEOMETRY"),
];

/// Spellings that always denote an integer (`NUMBER(38,0)`).
const INTEGER_SPELLINGS: &[&str] = &["INT", "INTEGER", "BIGINT", "SMALLINT", "TINYINT", "BYTEINT"];

/// Broad family a store type belongs to; decides how arguments map to facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// `NUMBER(p, s)`.
    Numeric,
    /// Approximate numerics; arguments are ignored.
    Float,
    /// `VARCHAR(n)` / `CHAR(n)`.
    Text,
    /// `BINARY(n)`.
    Binary,
    /// `DATE`, `TIME(p)`, `TIMESTAMP_*(p)`.
    Temporal,
    /// Everything else.
    Other,
}

/// A parsed store type name such as `NUMBER(10, 2)` or `timestamp_tz(3)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTypeName {
    canonical: String,
    spelled: String,
    args: Vec<u32>,
}

impl StoreTypeName {
    /// Parse a store type name. Returns `None` for malformed input.
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (base, args) = match trimmed.find('(') {
            Some(open) => {
                let close = trimmed.rfind(')')?;
                if close < open || !trimmed[close + 1..].trim().is_empty() {
                    return None;
                }
                let args = trimmed[open + 1..close]
                    .split(',')
                    .map(|a| a.trim().parse::<u32>().ok())
                    .collect::<Option<Vec<_>>>()?;
                (&trimmed[..open], args)
            }
            None => (trimmed, Vec::new()),
        };

        let spelled = base
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if spelled.is_empty() {
            return None;
        }

        Some(Self {
            canonical: canonical_name(&spelled).to_string(),
            spelled,
            args,
        })
    }

    /// The canonical base name (`STRING(10)` → `VARCHAR`).
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The base name as written, upper-cased.
    pub fn spelled(&self) -> &str {
        &self.spelled
    }

    /// The numeric arguments inside the parentheses.
    pub fn args(&self) -> &[u32] {
        &self.args
    }

    /// Whether the name is one of the integer-only spellings.
    pub fn is_integer_spelling(&self) -> bool {
        INTEGER_SPELLINGS.contains(&self.spelled.as_str())
    }

    /// The family of the canonical type.
    pub fn family(&self) -> TypeFamily {
        match self.canonical.as_str() {
            "NUMBER" => TypeFamily::Numeric,
            "FLOAT" => TypeFamily::Float,
            "VARCHAR" | "CHAR" => TypeFamily::Text,
            "BINARY" => TypeFamily::Binary,
            "DATE" | "TIME" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" | "TIMESTAMP_TZ" => {
                TypeFamily::Temporal
            }
            _ => TypeFamily::Other,
        }
    }

    /// Facets written inside the name, interpreted by family.
    pub fn facets(&self) -> Facets {
        let first = self.args.first().copied();
        match self.family() {
            TypeFamily::Numeric => Facets {
                precision: first,
                scale: self.args.get(1).copied(),
                ..Facets::default()
            },
            TypeFamily::Text | TypeFamily::Binary => Facets {
                size: first,
                fixed_length: (self.canonical == "CHAR").then_some(true),
                ..Facets::default()
            },
            TypeFamily::Temporal => Facets {
                precision: first,
                ..Facets::default()
            },
            TypeFamily::Float | TypeFamily::Other => Facets::default(),
        }
    }
}

impl fmt::Display for StoreTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelled)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

/// Map an upper-cased spelling to its canonical name.
///
/// Unknown names are returned unchanged so that lookups simply miss.
pub fn canonical_name(spelled: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == spelled)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(spelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let name = StoreTypeName::parse("varchar").unwrap();
        assert_eq!(name.canonical(), "VARCHAR");
        assert!(name.args().is_empty());
    }

    #[test]
    fn test_parse_with_args() {
        let name = StoreTypeName::parse("NUMBER( 10 , 2 )").unwrap();
        assert_eq!(name.canonical(), "NUMBER");
        assert_eq!(name.args(), &[10, 2]);
        let facets = name.facets();
        assert_eq!(facets.precision, Some(10));
        assert_eq!(facets.scale, Some(2));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(StoreTypeName::parse("string").unwrap().canonical(), "VARCHAR");
        assert_eq!(
            StoreTypeName::parse("double   precision").unwrap().canonical(),
            "FLOAT"
        );
        assert_eq!(
            StoreTypeName::parse("DateTime").unwrap().canonical(),
            "TIMESTAMP_NTZ"
        );
        assert_eq!(
            StoreTypeName::parse("timestamp with time zone").unwrap().canonical(),
            "TIMESTAMP_TZ"
        );
    }

    #[test]
    fn test_integer_spelling() {
        assert!(StoreTypeName::parse("BIGINT").unwrap().is_integer_spelling());
        assert!(!StoreTypeName::parse("NUMBER").unwrap().is_integer_spelling());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(StoreTypeName::parse("").is_none());
        assert!(StoreTypeName::parse("NUMBER(a)").is_none());
        assert!(StoreTypeName::parse("NUMBER(10").is_none());
        assert!(StoreTypeName::parse("NUMBER(10) x").is_none());
    }

    #[test]
    fn test_temporal_facets_use_precision() {
        let facets = StoreTypeName::parse("TIMESTAMP_TZ(3)").unwrap().facets();
        assert_eq!(facets.precision, Some(3));
        assert_eq!(facets.size, None);
    }

    #[test]
    fn test_unknown_name_kept() {
        let name = StoreTypeName::parse("HYPERLOGLOG").unwrap();
        assert_eq!(name.canonical(), "HYPERLOGLOG");
        assert_eq!(name.family(), TypeFamily::Other);
    }
}
